//! gRPC 스텁 생성.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 시스템 protoc 대신 번들된 바이너리 사용
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc);

    println!("cargo:rerun-if-changed=proto/account.proto");
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/account.proto"], &["proto"])?;

    Ok(())
}
