//! Native plugin host (C6): the producer/transformer/consumer ABI, artifact
//! resolution and `libloading`-based loading, and the dispatch-table driver
//! that ties a loaded plugin to an [`mads_agent::Agent`].

pub mod error;
pub mod host;
pub mod loader;
pub mod params;
pub mod traits;

pub use error::PluginHostError;
pub use host::{LoadedRole, PluginHost};
pub use loader::{
    load_consumer, load_producer, load_transformer, resolve_artifact_path, LoadedConsumer,
    LoadedProducer, LoadedTransformer,
};
pub use params::{ParamOverride, PluginParams};
pub use traits::{
    dispatch, ConsumerPlugin, DispatchAction, MadsPlugin, PluginBlob, PluginKind, ProducerPlugin,
    ReturnCode, TransformerPlugin,
};
