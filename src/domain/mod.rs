pub mod track;
pub mod youtube;
