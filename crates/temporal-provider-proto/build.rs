const PROTOS: &[&str] = &[
    "proto/google/rpc/status.proto",
    "proto/temporal/api/enums/v1/namespace.proto",
    "proto/temporal/api/enums/v1/common.proto",
    "proto/temporal/api/namespace/v1/message.proto",
    "proto/temporal/api/errordetails/v1/message.proto",
    "proto/temporal/api/workflowservice/v1/request_response.proto",
    "proto/temporal/api/workflowservice/v1/service.proto",
    "proto/temporal/api/operatorservice/v1/request_response.proto",
    "proto/temporal/api/operatorservice/v1/service.proto",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Server stubs back the in-process fakes used by client tests
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(PROTOS, &["proto"])?;

    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
