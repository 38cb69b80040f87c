use taskboard_core::{
    DocumentBackend, LocalBackend, MemoryDocumentStore, MemoryKeyValueStore, MemoryTransport,
    RestBackend,
};
use taskboard_test_support::run_backend_conformance;

#[test]
fn local_backend_over_memory_conforms() {
    let kv = MemoryKeyValueStore::new();
    run_backend_conformance(|| LocalBackend::new(kv.clone()));
}

#[test]
fn document_backend_over_memory_conforms() {
    let docs = MemoryDocumentStore::new();
    run_backend_conformance(|| DocumentBackend::new(docs.clone()));
}

#[test]
fn rest_backend_over_memory_transport_conforms() {
    let transport = MemoryTransport::new();
    run_backend_conformance(|| RestBackend::new(transport.clone()));
}
