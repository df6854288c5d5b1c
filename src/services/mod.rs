pub mod classifier;
pub mod media;
pub mod optimizer;
pub mod pipeline;
pub mod publisher;
pub mod record_store;
pub mod signer;
pub mod stager;
pub mod storage;
