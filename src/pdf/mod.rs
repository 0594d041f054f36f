pub mod classifier;
pub mod image_xobject;
pub mod optimizer;
pub mod reader;
pub mod writer;
