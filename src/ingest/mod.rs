pub mod eia;
pub mod normalize;

#[cfg(test)]
pub(crate) mod fixtures;
