use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

/// Transfer-learning backbones offered by the Keras transfer learn block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "transfer_mobilenetv2_a35")]
    MobileNetV2A35,
    #[serde(rename = "transfer_mobilenetv2_a1")]
    MobileNetV2A1,
    #[serde(rename = "transfer_mobilenetv2_a05")]
    MobileNetV2A05,
    #[serde(rename = "transfer_mobilenetv2_160_a1")]
    MobileNetV2_160A1,
    #[serde(rename = "transfer_mobilenetv2_160_a75")]
    MobileNetV2_160A75,
    #[serde(rename = "transfer_mobilenetv2_160_a5")]
    MobileNetV2_160A5,
    #[serde(rename = "transfer_mobilenetv2_160_a35")]
    MobileNetV2_160A35,
    #[serde(rename = "transfer_mobilenetv1_a25_d100")]
    MobileNetV1A25D100,
    #[serde(rename = "transfer_mobilenetv1_a2_d100")]
    MobileNetV1A2D100,
    #[serde(rename = "transfer_mobilenetv1_a1_d100")]
    MobileNetV1A1D100,
    /// Hosted as an organization block, trained with [`OrganizationTraining`].
    #[serde(rename = "transfer_efficientnet_b0")]
    EfficientNetB0,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 11] = [
        ModelVariant::MobileNetV2A35,
        ModelVariant::MobileNetV2A1,
        ModelVariant::MobileNetV2A05,
        ModelVariant::MobileNetV2_160A1,
        ModelVariant::MobileNetV2_160A75,
        ModelVariant::MobileNetV2_160A5,
        ModelVariant::MobileNetV2_160A35,
        ModelVariant::MobileNetV1A25D100,
        ModelVariant::MobileNetV1A2D100,
        ModelVariant::MobileNetV1A1D100,
        ModelVariant::EfficientNetB0,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::MobileNetV2A35 => "transfer_mobilenetv2_a35",
            ModelVariant::MobileNetV2A1 => "transfer_mobilenetv2_a1",
            ModelVariant::MobileNetV2A05 => "transfer_mobilenetv2_a05",
            ModelVariant::MobileNetV2_160A1 => "transfer_mobilenetv2_160_a1",
            ModelVariant::MobileNetV2_160A75 => "transfer_mobilenetv2_160_a75",
            ModelVariant::MobileNetV2_160A5 => "transfer_mobilenetv2_160_a5",
            ModelVariant::MobileNetV2_160A35 => "transfer_mobilenetv2_160_a35",
            ModelVariant::MobileNetV1A25D100 => "transfer_mobilenetv1_a25_d100",
            ModelVariant::MobileNetV1A2D100 => "transfer_mobilenetv1_a2_d100",
            ModelVariant::MobileNetV1A1D100 => "transfer_mobilenetv1_a1_d100",
            ModelVariant::EfficientNetB0 => "transfer_efficientnet_b0",
        }
    }

    pub fn is_organization_block(self) -> bool {
        self == ModelVariant::EfficientNetB0
    }
}

impl Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model variant {0}")]
pub struct UnknownVariant(String);

impl FromStr for ModelVariant {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ModelVariant::ALL
            .iter()
            .copied()
            .find(|variant| variant.as_str() == value)
            .ok_or_else(|| UnknownVariant(value.to_owned()))
    }
}

/// Square input resolution of the image input block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ImageSize {
    Px96,
    Px160,
}

impl ImageSize {
    pub fn pixels(self) -> u32 {
        match self {
            ImageSize::Px96 => 96,
            ImageSize::Px160 => 160,
        }
    }
}

impl From<ImageSize> for u32 {
    fn from(size: ImageSize) -> Self {
        size.pixels()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported image size {0}, expected 96 or 160")]
pub struct UnsupportedSize(u32);

impl std::convert::TryFrom<u32> for ImageSize {
    type Error = UnsupportedSize;

    fn try_from(pixels: u32) -> Result<Self, Self::Error> {
        match pixels {
            96 => Ok(ImageSize::Px96),
            160 => Ok(ImageSize::Px160),
            other => Err(UnsupportedSize(other)),
        }
    }
}

impl FromStr for ImageSize {
    type Err = UnsupportedSize;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        use std::convert::TryFrom;
        let pixels = value.parse::<u32>().map_err(|_| UnsupportedSize(0))?;
        ImageSize::try_from(pixels)
    }
}

impl Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

/// Hyperparameters sent with every Keras training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParameters {
    pub training_cycles: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub train_test_split: f64,
    pub auto_class_weights: bool,
    pub dropout_rate: f64,
    /// Size of the dense layer on top of the backbone, 0 for none.
    pub neurons: u32,
    pub profile_int8: bool,
    pub organization: OrganizationTraining,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        TrainingParameters {
            training_cycles: 20,
            learning_rate: 0.0005,
            batch_size: 16,
            train_test_split: 0.2,
            auto_class_weights: false,
            dropout_rate: 0.1,
            neurons: 0,
            profile_int8: false,
            organization: OrganizationTraining::default(),
        }
    }
}

/// Settings for backbones that live in an organization block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationTraining {
    pub organization_model_id: u64,
    /// Free-form block parameters, passed through as strings.
    pub custom_parameters: BTreeMap<String, String>,
}

impl Default for OrganizationTraining {
    fn default() -> Self {
        let custom_parameters = [
            ("epochs", "30"),
            ("learning-rate", "0.001"),
            ("use-pretrained-weights", "true"),
            ("freeze-percentage-of-layers", "90"),
            ("last-layers", "dense: 32, dropout: 0.1"),
            ("data-augmentation", ""),
            ("model-size", "b0"),
            ("batch-size", "16"),
            ("early-stopping", "true"),
            ("early-stopping-patience", "5"),
            ("early-stopping-min-delta", "0.001"),
        ]
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        OrganizationTraining {
            organization_model_id: 6575,
            custom_parameters,
        }
    }
}
