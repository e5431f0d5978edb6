use crate::ConversionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartConversion(ConversionConfig),
}
