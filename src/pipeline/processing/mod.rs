// Pipeline processing: validation, transformation, and duplicate detection

pub mod dedupe;
pub mod normalize;
pub mod quality_gate;
