use super::FilterNode;
use audx_core::Result;

/// Graph entry (`abuffer`) or exit (`abuffersink`); samples pass unchanged
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    name: &'static str,
}

impl Endpoint {
    pub const SOURCE: &'static str = "abuffer";
    pub const SINK: &'static str = "abuffersink";

    pub fn source() -> Self {
        Self { name: Self::SOURCE }
    }

    pub fn sink() -> Self {
        Self { name: Self::SINK }
    }
}

impl FilterNode for Endpoint {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        Ok(input.to_vec())
    }
}
