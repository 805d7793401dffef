use std::hash::Hasher;

/// Feed an `f64` into a hasher so that `0.0` and `-0.0` collide, matching
/// `PartialEq` for every non-NaN value.
pub(crate) fn hash_f64<H: Hasher>(value: f64, state: &mut H) {
    state.write_u64((value + 0.0).to_bits());
}

pub(crate) fn hash_opt_f64<H: Hasher>(value: Option<f64>, state: &mut H) {
    match value {
        Some(v) => {
            state.write_u8(1);
            hash_f64(v, state);
        }
        None => state.write_u8(0),
    }
}
