//! Generates the `StreamingServer` client and server glue.
//!
//! Message types are declared by hand in `src/proto.rs`, so the service is
//! described with `tonic_build::manual` and no `protoc` is needed.

use tonic_build::manual::{Builder, Method, Service};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let streaming = Service::builder()
        .name("StreamingServer")
        .package("relay.streaming")
        .method(
            Method::builder()
                .name("bidirectional_stream")
                .route_name("BidirectionalStream")
                .input_type("crate::proto::StreamMessage")
                .output_type("crate::proto::StreamResponse")
                .codec_path("tonic::codec::ProstCodec")
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .method(
            Method::builder()
                .name("server_stream")
                .route_name("ServerStream")
                .input_type("crate::proto::StreamMessage")
                .output_type("crate::proto::StreamResponse")
                .codec_path("tonic::codec::ProstCodec")
                .server_streaming()
                .build(),
        )
        .method(
            Method::builder()
                .name("client_stream")
                .route_name("ClientStream")
                .input_type("crate::proto::StreamMessage")
                .output_type("crate::proto::StreamResponse")
                .codec_path("tonic::codec::ProstCodec")
                .client_streaming()
                .build(),
        )
        .build();

    Builder::new().compile(&[streaming]);
}
