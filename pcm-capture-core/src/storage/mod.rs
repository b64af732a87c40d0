pub mod container_writer;
pub mod metadata;
pub mod raw_sink;
