// Pipeline processing: per-field normalization and staging validation

pub mod normalize;
pub mod validate;
