use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{api::training::{ImageSize, ModelVariant}, BlockId};

/// Block type of the learn block every pipeline is created with.
pub const KERAS_TRANSFER_IMAGE: &str = "keras-transfer-image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DspType {
    Image,
    Raw,
}

impl Default for DspType {
    fn default() -> Self {
        DspType::Image
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizePolicy {
    Squash,
    FitShort,
    FitLong,
    Crop,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        ResizePolicy::Squash
    }
}

impl Display for ResizePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResizePolicy::Squash => "squash",
            ResizePolicy::FitShort => "fit-short",
            ResizePolicy::FitLong => "fit-long",
            ResizePolicy::Crop => "crop",
        };
        f.write_str(name)
    }
}

/// What to build when creating a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    pub name: String,
    pub image_size: ImageSize,
    pub dsp_type: DspType,
    pub resize_policy: ResizePolicy,
    pub model: ModelVariant,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>, image_size: ImageSize, model: ModelVariant) -> Self {
        PipelineSpec {
            name: name.into(),
            image_size,
            dsp_type: DspType::default(),
            resize_policy: ResizePolicy::default(),
            model,
        }
    }
}

/// The single live pipeline of a project, as created remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDescriptor {
    pub input_block_id: BlockId,
    pub dsp_block_id: BlockId,
    pub learn_block_id: BlockId,
    pub dsp_type: DspType,
    pub resize_policy: ResizePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockInfo {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// Block listing of the currently configured pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineBlocks {
    #[serde(default)]
    pub input_blocks: Vec<BlockInfo>,
    #[serde(default)]
    pub dsp_blocks: Vec<BlockInfo>,
    #[serde(default)]
    pub learn_blocks: Vec<BlockInfo>,
}

impl PipelineBlocks {
    pub fn dsp_block(&self) -> Option<BlockId> {
        self.dsp_blocks.first().map(|block| block.id)
    }

    /// The Keras transfer learn block, looked up by type.
    pub fn learn_block(&self) -> Option<BlockId> {
        self.learn_blocks
            .iter()
            .find(|block| block.kind == KERAS_TRANSFER_IMAGE)
            .map(|block| block.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_block_is_matched_by_type() {
        let blocks: PipelineBlocks = serde_json::from_str(
            r#"{
                "inputBlocks": [{ "id": 1, "type": "image", "name": "in" }],
                "dspBlocks": [{ "id": 2, "type": "image", "name": "dsp" }, { "id": 9, "type": "raw" }],
                "learnBlocks": [
                    { "id": 7, "type": "keras-regression", "name": "other" },
                    { "id": 3, "type": "keras-transfer-image", "name": "learn" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(blocks.dsp_block(), Some(BlockId::from(2)));
        assert_eq!(blocks.learn_block(), Some(BlockId::from(3)));
    }

    #[test]
    fn empty_pipeline_resolves_nothing() {
        let blocks: PipelineBlocks = serde_json::from_str("{}").unwrap();
        assert_eq!(blocks.dsp_block(), None);
        assert_eq!(blocks.learn_block(), None);
    }

    #[test]
    fn resize_policy_uses_remote_spelling() {
        assert_eq!(serde_json::to_string(&ResizePolicy::FitShort).unwrap(), "\"fit-short\"");
        assert_eq!(ResizePolicy::Squash.to_string(), "squash");
    }
}
