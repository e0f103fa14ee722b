use fastmin_core::version::{version_string, SCHEMA_VERSION, VERSION};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

#[derive(Serialize)]
struct VersionJson {
    version: &'static str,
    schema_version: u32,
}

pub fn run(json: bool) -> Result<()> {
    if json {
        let report = VersionJson {
            version: VERSION,
            schema_version: SCHEMA_VERSION,
        };
        println!("{}", serde_json::to_string(&report).into_diagnostic()?);
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
