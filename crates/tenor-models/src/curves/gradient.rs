//! Global gradient vector and its partition into component blocks.

use std::collections::HashMap;

use crate::error::{ModelError, ModelResult};

/// Contiguous slice of the global gradient owned by one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradientBlock {
    /// Component key.
    pub target_key: String,
    /// First index in the global vector.
    pub offset: usize,
    /// Number of parameters (pillars).
    pub length: usize,
}

/// Block layout of a model's parameters, in first-seen component order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientLayout {
    blocks: Vec<GradientBlock>,
    by_key: HashMap<String, usize>,
    labels: Vec<String>,
}

impl GradientLayout {
    /// Creates an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block for `key` with one label per parameter.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` if the key already has a block.
    pub fn push(&mut self, key: &str, labels: Vec<String>) -> ModelResult<()> {
        let norm = key.to_uppercase();
        if self.by_key.contains_key(&norm) {
            return Err(ModelError::configuration(format!(
                "gradient block '{key}' already exists"
            )));
        }
        self.by_key.insert(norm, self.blocks.len());
        self.blocks.push(GradientBlock {
            target_key: key.to_string(),
            offset: self.labels.len(),
            length: labels.len(),
        });
        self.labels.extend(labels);
        Ok(())
    }

    /// Block of a component.
    pub fn block(&self, key: &str) -> Option<&GradientBlock> {
        self.by_key.get(&key.to_uppercase()).map(|&i| &self.blocks[i])
    }

    /// All blocks in order.
    pub fn blocks(&self) -> &[GradientBlock] {
        &self.blocks
    }

    /// Total parameter count.
    pub fn total_len(&self) -> usize {
        self.labels.len()
    }

    /// One label per parameter.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Caller-owned accumulator for one risk pass.
///
/// Engines write into it through
/// [`ValuationEngine::calculate_first_order_risk`](crate::valuation::ValuationEngine::calculate_first_order_risk);
/// each independent pass needs its own buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBuffer {
    values: Vec<f64>,
}

impl GradientBuffer {
    /// A zeroed buffer of `len` parameters.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// A zeroed buffer sized for `layout`.
    #[must_use]
    pub fn for_layout(layout: &GradientLayout) -> Self {
        Self::new(layout.total_len())
    }

    /// Zeroes every entry.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read-only view.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Copy of the current contents.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// Adds `contributions` into the block starting at `offset`; when
    /// `accumulate` is false the block is overwritten instead.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if the block does not fit.
    pub fn add_block(
        &mut self,
        offset: usize,
        contributions: &[f64],
        accumulate: bool,
    ) -> ModelResult<()> {
        let end = offset + contributions.len();
        let Some(slot) = self.values.get_mut(offset..end) else {
            return Err(ModelError::data(format!(
                "gradient block {offset}..{end} outside buffer of length {}",
                self.values.len()
            )));
        };
        for (dst, src) in slot.iter_mut().zip(contributions) {
            if accumulate {
                *dst += src;
            } else {
                *dst = *src;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GradientLayout {
        let mut layout = GradientLayout::new();
        layout.push("SOFR-1B", vec!["a".into(), "b".into()]).unwrap();
        layout.push("USD-LIBOR-BBA-3M", vec!["c".into()]).unwrap();
        layout
    }

    #[test]
    fn test_blocks_in_first_seen_order() {
        let layout = layout();
        assert_eq!(layout.total_len(), 3);
        assert_eq!(layout.block("sofr-1b").unwrap().offset, 0);
        let libor = layout.block("USD-LIBOR-BBA-3M").unwrap();
        assert_eq!((libor.offset, libor.length), (2, 1));
        assert_eq!(
            layout.blocks().iter().map(|b| b.length).sum::<usize>(),
            layout.total_len()
        );
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let mut layout = layout();
        assert!(layout.push("SOFR-1B", vec![]).is_err());
    }

    #[test]
    fn test_accumulate_and_overwrite() {
        let mut buffer = GradientBuffer::for_layout(&layout());
        buffer.add_block(0, &[1.0, 2.0], true).unwrap();
        buffer.add_block(0, &[1.0, 1.0], true).unwrap();
        buffer.add_block(2, &[5.0], true).unwrap();
        assert_eq!(buffer.as_slice(), &[2.0, 3.0, 5.0]);

        buffer.add_block(0, &[7.0, 7.0], false).unwrap();
        assert_eq!(buffer.to_vec(), vec![7.0, 7.0, 5.0]);

        buffer.clear();
        assert!(buffer.as_slice().iter().all(|v| *v == 0.0));
        assert!(buffer.add_block(2, &[1.0, 1.0], true).is_err());
    }
}
