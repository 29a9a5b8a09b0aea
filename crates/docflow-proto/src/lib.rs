//! Generated client and server stubs for the worker pipeline gRPC contract.
//! The wire types are produced at build time by `tonic-build` from
//! `proto/docflow/v1/worker.proto`; this module just gives them a home.

pub mod v1 {
    tonic::include_proto!("docflow.v1");
}
