use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use lumen_collection::{
    resolve_source, CollectionBuilder, ImageCollection, ImageSequence, ImageSource, SequenceType,
};
use lumen_entity::Resolver;
use lumen_image::{ChannelKind, ImageRecord, View, MONO_TAG, STEREO_TAG};
use lumen_store::{BlobRefStore, FileBlobStore, FileDocumentStore, Payload};
use lumen_types::{
    BoundingBox, CameraIntrinsics, DocumentId, ImageMetadata, ImageSourceType, LabelledObject,
    Timestamp, Transform,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::*;
use crate::config::LumenConfig;

/// Stores and resolver opened under the configured data directory.
pub struct Workspace {
    docs: Arc<FileDocumentStore>,
    blobs: BlobRefStore,
    resolver: Resolver,
}

impl Workspace {
    pub fn open(config: &LumenConfig) -> anyhow::Result<Self> {
        let docs = Arc::new(
            FileDocumentStore::open(config.docs_dir())
                .with_context(|| format!("cannot open documents in {}", config.data_dir.display()))?,
        );
        let blobs = BlobRefStore::new(Arc::new(
            FileBlobStore::open(config.blobs_dir(), config.compression_level)
                .with_context(|| format!("cannot open blobs in {}", config.data_dir.display()))?,
        ));
        let resolver = Resolver::new(
            docs.clone(),
            blobs.clone(),
            lumen_collection::default_registry(),
        );
        tracing::debug!(data_dir = %config.data_dir.display(), "workspace opened");
        Ok(Self {
            docs,
            blobs,
            resolver,
        })
    }
}

pub fn run_command(cli: Cli, config: &LumenConfig) -> anyhow::Result<()> {
    let ws = Workspace::open(config)?;
    match cli.command {
        Command::Synth(args) => cmd_synth(&ws, &args).map(|_| ()),
        Command::Show(args) => cmd_show(&ws, &args),
        Command::Replay(args) => cmd_replay(&ws, &args).map(|_| ()),
    }
}

fn parse_id(text: &str) -> anyhow::Result<DocumentId> {
    DocumentId::from_str(text).with_context(|| format!("not a document id: {text}"))
}

fn yes_no(flag: bool) -> colored::ColoredString {
    if flag {
        "yes".green()
    } else {
        "no".dimmed()
    }
}

fn cmd_synth(ws: &Workspace, args: &SynthArgs) -> anyhow::Result<DocumentId> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut builder = match args.kind {
        AggregateKind::Sequence => CollectionBuilder::sequence(),
        AggregateKind::Collection => CollectionBuilder::collection(SequenceType::NonSequential),
    };
    for frame in 0..args.frames {
        let image = synth_frame(&mut rng, args, frame)?;
        let timestamp = Timestamp::new(f64::from(frame) * args.interval)?;
        builder.add_image(image, Some(timestamp));
    }

    let id = builder.save(ws.docs.as_ref(), &ws.blobs)?;
    let kind = match args.kind {
        AggregateKind::Sequence => "sequence",
        AggregateKind::Collection => "collection",
    };
    println!(
        "{} Saved {} {} ({} frames)",
        "✓".green().bold(),
        kind,
        id.to_string().yellow(),
        args.frames
    );
    Ok(id)
}

/// One random frame. Poses advance along x so stereo baselines stay fixed.
fn synth_frame(rng: &mut StdRng, args: &SynthArgs, frame: u32) -> anyhow::Result<ImageRecord> {
    let (h, w) = (args.height as usize, args.width as usize);
    let intrinsics = CameraIntrinsics::from_pixels(
        f64::from(args.width),
        f64::from(args.width),
        f64::from(args.width) / 2.0,
        f64::from(args.height) / 2.0,
        args.width,
        args.height,
    );
    let mut metadata = ImageMetadata::new(ImageSourceType::Synthetic, args.height, args.width)
        .with_intrinsics(intrinsics)
        .with_simulation_world("lumen-synth");
    if args.labels {
        let bw = rng.gen_range(1..=args.width.max(1));
        let bh = rng.gen_range(1..=args.height.max(1));
        metadata = metadata.with_labelled_objects(vec![LabelledObject::new(
            ["object"],
            BoundingBox::new(0, 0, bw, bh),
        )]);
    }
    if args.stereo {
        metadata = metadata.with_right_intrinsics(intrinsics);
    }

    let x = f64::from(frame) * 0.1;
    let left = synth_view(rng, args, Transform::from_location([x, 0.0, 1.5]), h, w)?;
    let image = if args.stereo {
        let pose = Transform::from_location([x + args.baseline, 0.0, 1.5]);
        let right = synth_view(rng, args, pose, h, w)?;
        ImageRecord::stereo(left, right, metadata)?
    } else {
        ImageRecord::mono(left, metadata)?
    };
    Ok(image)
}

fn synth_view(
    rng: &mut StdRng,
    args: &SynthArgs,
    pose: Transform,
    h: usize,
    w: usize,
) -> anyhow::Result<View> {
    let colour = Payload::from_u8(vec![h, w, 3], (0..h * w * 3).map(|_| rng.gen()).collect())?;
    let mut view = View::new(pose, colour);
    if args.depth {
        let depth = (0..h * w).map(|_| rng.gen_range(0.5f32..20.0)).collect();
        view = view.with_depth(Payload::from_f32(vec![h, w], depth)?);
    }
    if args.labels {
        let labels = (0..h * w).map(|_| rng.gen_range(0u16..8)).collect();
        view = view.with_labels(Payload::from_u16(vec![h, w], labels)?);
    }
    if args.normals {
        let normals = (0..h * w * 3).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
        view = view.with_world_normals(Payload::from_f32(vec![h, w, 3], normals)?);
    }
    Ok(view)
}

fn cmd_show(ws: &Workspace, args: &ShowArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let entity = ws.resolver.resolve(&id)?;
    println!("{} {}", entity.type_tag().bold(), id.to_string().yellow());

    match entity.type_tag() {
        ImageCollection::TAG => {
            let collection = entity
                .into_any()
                .downcast::<ImageCollection>()
                .map_err(|_| anyhow!("{id} did not decode as a collection"))?;
            print_source(&*collection);
            match collection.camera_intrinsics() {
                Some(k) => println!(
                    "  Intrinsics: fx={:.3} fy={:.3} cx={:.3} cy={:.3}",
                    k.fx, k.fy, k.cx, k.cy
                ),
                None => println!("  Intrinsics: {}", "mixed or unknown".dimmed()),
            }
            if let Some(baseline) = collection.stereo_baseline() {
                println!("  Baseline: {baseline:.4}");
            }
        }
        ImageSequence::TAG => {
            let sequence = entity
                .into_any()
                .downcast::<ImageSequence>()
                .map_err(|_| anyhow!("{id} did not decode as a sequence"))?;
            print_source(&*sequence);
        }
        MONO_TAG | STEREO_TAG => {
            let image = entity
                .into_any()
                .downcast::<ImageRecord>()
                .map_err(|_| anyhow!("{id} did not decode as an image"))?;
            print_image(&image)?;
        }
        other => bail!("{other} is not an image type"),
    }
    Ok(())
}

fn print_source(source: &dyn ImageSource) {
    let caps = source.capabilities();
    println!("  Sequence type: {}", source.sequence_type());
    println!("  Random access: {}", yes_no(source.supports_random_access()));
    println!("  Frames: {}", source.len());
    println!(
        "  Depth: {}  Labels: {}  Normals: {}  Stereo: {}  Boxes: {}",
        yes_no(caps.depth),
        yes_no(caps.labels),
        yes_no(caps.normals),
        yes_no(caps.stereo),
        yes_no(caps.bounding_boxes)
    );
    if let (Some(first), Some(last)) = (source.timestamps().first(), source.timestamps().last()) {
        println!("  Timestamps: {first} .. {last}");
    }
}

fn print_image(image: &ImageRecord) -> anyhow::Result<()> {
    let meta = image.metadata();
    println!("  Size: {}x{} ({:?})", meta.width, meta.height, meta.source_type);
    let location = image.camera_pose().location();
    println!(
        "  Pose: [{:.3}, {:.3}, {:.3}]",
        location[0], location[1], location[2]
    );
    if let Some(baseline) = image.stereo_baseline() {
        println!("  Baseline: {baseline:.4}");
    }
    for kind in ChannelKind::ALL {
        println!("  {kind}: {}", yes_no(image.has_channel(kind)?));
    }
    Ok(())
}

fn cmd_replay(ws: &Workspace, args: &ReplayArgs) -> anyhow::Result<usize> {
    let id = parse_id(&args.id)?;
    let source = resolve_source(&ws.resolver, &id)?;
    let limit = args.limit.unwrap_or(usize::MAX);

    let mut cursor = source.begin();
    let mut replayed = 0;
    while replayed < limit {
        let Some((image, timestamp)) = cursor.get_next() else {
            break;
        };
        let colour = image.colour()?;
        let (h, w) = colour.dimensions().unwrap_or((0, 0));
        println!(
            "  {:>10}  {}x{}  mean {:.1}",
            timestamp.to_string().cyan(),
            w,
            h,
            colour.mean().unwrap_or(0.0)
        );
        replayed += 1;
    }

    let status = if cursor.is_complete() {
        "complete".green()
    } else {
        "stopped early".yellow()
    };
    println!("{} Replayed {} frames ({})", "✓".green().bold(), replayed, status);
    Ok(replayed)
}
