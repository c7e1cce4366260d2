// ============================================================
// Layer 5 — Sequence Masks
// ============================================================
// Converts per-example valid lengths into a binary validity mask
// for a right-padded batch:
//
//   lengths = [2, 4], max_len = 4
//   mask    = [[1, 1, 0, 0],
//              [1, 1, 1, 1]]
//
// mask[b, t] = 1 iff t < lengths[b]. Lengths are host-side values,
// so they are validated before any tensor is built.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::domain::error::{GroundingError, GroundingResult};

/// Reject any length outside `1..=max_len`.
pub fn validate_lengths(lengths: &[usize], max_len: usize) -> GroundingResult<()> {
    match lengths
        .iter()
        .enumerate()
        .find(|(_, &len)| len == 0 || len > max_len)
    {
        Some((index, &length)) => Err(GroundingError::InvalidLength { index, length, max_len }),
        None => Ok(()),
    }
}

/// Build the float validity mask [batch, max_len] for `lengths`.
pub fn sequence_mask<B: Backend>(
    lengths: &[usize],
    max_len: usize,
    device:  &B::Device,
) -> GroundingResult<Tensor<B, 2>> {
    validate_lengths(lengths, max_len)?;

    let values: Vec<f32> = lengths
        .iter()
        .flat_map(|&len| (0..max_len).map(move |t| if t < len { 1.0 } else { 0.0 }))
        .collect();

    Ok(Tensor::from_data(
        TensorData::new(values, [lengths.len(), max_len]),
        device,
    ))
}

/// One-hot selector [batch, max_len] marking each example's last valid step.
pub fn last_step_selector<B: Backend>(
    lengths: &[usize],
    max_len: usize,
    device:  &B::Device,
) -> GroundingResult<Tensor<B, 2>> {
    validate_lengths(lengths, max_len)?;

    let values: Vec<f32> = lengths
        .iter()
        .flat_map(|&len| (0..max_len).map(move |t| if t + 1 == len { 1.0 } else { 0.0 }))
        .collect();

    Ok(Tensor::from_data(
        TensorData::new(values, [lengths.len(), max_len]),
        device,
    ))
}

/// Column of per-example lengths as floats, shape [batch, 1].
pub fn length_column<B: Backend>(lengths: &[usize], device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = lengths.iter().map(|&len| len as f32).collect();
    Tensor::from_data(TensorData::new(values, [lengths.len(), 1]), device)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_rows_sum_to_lengths() {
        let device  = Default::default();
        let lengths = [1usize, 3, 5, 2];
        let mask    = sequence_mask::<TestBackend>(&lengths, 7, &device).unwrap();
        assert_eq!(mask.dims(), [4, 7]);

        let sums = mask.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for (sum, len) in sums.iter().zip(lengths) {
            assert_eq!(*sum, len as f32);
        }
    }

    #[test]
    fn test_padded_positions_are_zero() {
        let device = Default::default();
        let mask   = sequence_mask::<TestBackend>(&[2, 4], 4, &device).unwrap();
        let values = mask.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let device = Default::default();
        let err    = sequence_mask::<TestBackend>(&[3, 0], 4, &device).unwrap_err();
        assert_eq!(err, GroundingError::InvalidLength { index: 1, length: 0, max_len: 4 });
    }

    #[test]
    fn test_length_beyond_padding_is_rejected() {
        assert!(matches!(
            validate_lengths(&[4, 6], 5),
            Err(GroundingError::InvalidLength { index: 1, length: 6, max_len: 5 })
        ));
    }

    #[test]
    fn test_last_step_selector() {
        let device = Default::default();
        let sel    = last_step_selector::<TestBackend>(&[2, 3], 3, &device).unwrap();
        let values = sel.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }
}
