//! Encoded training patterns, grouped into fixed-capacity batches.

use crate::encoder::Encoder;
use crate::error::{check_dim, Error, Result};
use crate::matrix::Mat;

/// Up to `capacity` pairs of encoded input and output rows.
#[derive(Clone, Debug)]
pub struct Batch {
    capacity: usize,
    input: Mat,
    output: Mat,
}

impl Batch {
    pub fn new(capacity: usize, input_len: usize, output_len: usize) -> Self {
        Batch {
            capacity,
            input: Mat::zeros(0, input_len),
            output: Mat::zeros(0, output_len),
        }
    }

    /// Copies one pattern into the next free row.
    pub fn add_pair(&mut self, input: &[f64], output: &[f64]) -> Result<()> {
        if self.is_full() {
            return Err(Error::BatchFull {
                capacity: self.capacity,
            });
        }
        check_dim("Batch::add_pair input", self.input.cols(), input.len())?;
        check_dim("Batch::add_pair output", self.output.cols(), output.len())?;
        self.input.push_row(input)?;
        self.output.push_row(output)?;
        Ok(())
    }

    /// The filled input rows, `len() x input_len`.
    pub fn input(&self) -> &Mat {
        &self.input
    }

    /// The filled target rows, `len() x output_len`.
    pub fn output(&self) -> &Mat {
        &self.output
    }

    pub fn len(&self) -> usize {
        self.input.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A fixed set of batches fed from application values through a pair of
/// encoders. Pattern `i` goes to batch `i mod num_batches`.
pub struct TrainingData<I, O> {
    input_encoder: I,
    output_encoder: O,
    batches: Vec<Batch>,
    cursor: usize,
    len: usize,
}

impl<I, O> TrainingData<I, O>
where
    I: Encoder,
    O: Encoder,
{
    pub fn new(
        num_batches: usize,
        batch_capacity: usize,
        input_encoder: I,
        output_encoder: O,
    ) -> Result<Self> {
        if num_batches == 0 || batch_capacity == 0 {
            return Err(Error::InvalidParameter(format!(
                "need at least one batch of at least one pattern, got {} x {}",
                num_batches, batch_capacity
            )));
        }
        let batches = (0..num_batches)
            .map(|_| Batch::new(batch_capacity, input_encoder.len(), output_encoder.len()))
            .collect();
        Ok(TrainingData {
            input_encoder,
            output_encoder,
            batches,
            cursor: 0,
            len: 0,
        })
    }

    /// Encodes a pattern and stores it in the next batch in turn.
    pub fn add_pair(&mut self, input: &I::Value, output: &O::Value) -> Result<()> {
        let input = self.input_encoder.encode(input)?;
        let output = self.output_encoder.encode(output)?;
        self.add_encoded_pair(&input, &output)
    }

    /// Stores an already encoded pattern in the next batch in turn.
    pub fn add_encoded_pair(&mut self, input: &[f64], output: &[f64]) -> Result<()> {
        self.batches[self.cursor].add_pair(input, output)?;
        self.cursor = (self.cursor + 1) % self.batches.len();
        self.len += 1;
        Ok(())
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Number of patterns added.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn input_len(&self) -> usize {
        self.input_encoder.len()
    }

    pub fn output_len(&self) -> usize {
        self.output_encoder.len()
    }

    pub fn input_encoder(&self) -> &I {
        &self.input_encoder
    }

    pub fn output_encoder(&self) -> &O {
        &self.output_encoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{IdentityEncoder, OneHotEncoder};

    #[test]
    fn batch_stops_at_capacity() {
        let mut batch = Batch::new(2, 1, 1);
        batch.add_pair(&[1.0], &[0.0]).unwrap();
        batch.add_pair(&[2.0], &[1.0]).unwrap();
        assert!(batch.is_full());
        assert_eq!(
            batch.add_pair(&[3.0], &[0.0]),
            Err(Error::BatchFull { capacity: 2 })
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.input().as_slice(), &[1.0, 2.0]);
        assert_eq!(batch.output().as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn batch_checks_widths() {
        let mut batch = Batch::new(2, 2, 1);
        assert!(batch.add_pair(&[1.0], &[0.0]).is_err());
        assert!(batch.add_pair(&[1.0, 2.0], &[0.0, 1.0]).is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn pairs_are_dealt_round_robin() {
        let mut data = TrainingData::new(3, 4, IdentityEncoder, OneHotEncoder::new(0, 1).unwrap())
            .unwrap();
        assert_eq!((data.input_len(), data.output_len()), (1, 2));
        for i in 0..7 {
            data.add_pair(&(i as f64), &(i % 2)).unwrap();
        }
        assert_eq!(data.len(), 7);

        let sizes: Vec<usize> = data.batches().iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        assert_eq!(data.batches()[0].input().as_slice(), &[0.0, 3.0, 6.0]);
        assert_eq!(data.batches()[1].input().as_slice(), &[1.0, 4.0]);
        assert_eq!(data.batches()[2].input().as_slice(), &[2.0, 5.0]);
        assert_eq!(data.batches()[1].output().row(0), &[0.0, 1.0]);
    }

    #[test]
    fn unknown_values_are_not_stored() {
        let mut data =
            TrainingData::new(2, 1, IdentityEncoder, OneHotEncoder::new(0, 1).unwrap()).unwrap();
        assert!(matches!(
            data.add_pair(&1.0, &5),
            Err(Error::UnknownCategory(_))
        ));
        assert!(data.is_empty());
        data.add_pair(&1.0, &0).unwrap();
        data.add_pair(&2.0, &1).unwrap();
        assert_eq!(
            data.add_pair(&3.0, &1),
            Err(Error::BatchFull { capacity: 1 })
        );
        assert_eq!(data.len(), 2);
    }
}
