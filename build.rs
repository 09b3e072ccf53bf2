//! Build script for compiling protobuf definitions

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile proto files; fall back to the vendored pregenerated file
    // when protoc is not installed on the build machine.
    if let Err(e) = prost_build::compile_protos(&["proto/kendra.proto"], &["proto/"]) {
        if e.to_string().contains("protoc") {
            let out_dir = std::env::var("OUT_DIR")?;
            std::fs::copy(
                "proto/kendra.rs",
                std::path::Path::new(&out_dir).join("kendra.rs"),
            )?;
            println!("cargo:rerun-if-changed=proto/kendra.rs");
        } else {
            return Err(e.into());
        }
    }

    // Rerun if proto files change
    println!("cargo:rerun-if-changed=proto/kendra.proto");

    Ok(())
}
