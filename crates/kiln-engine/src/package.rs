//! Writing descriptors to disk and handing them to the packager.

use std::path::{Path, PathBuf};

use kiln_tools::{run_checked, ExternalTool, PackCommand};

use crate::descriptor::PackageDescriptor;
use crate::error::EngineError;

/// Location of the descriptor for package `id` inside `dir`.
pub fn descriptor_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.nuspec"))
}

/// Write `descriptor` as `<id>.nuspec` into `output_dir` and run the packager
/// on it. Returns the descriptor path.
///
/// # Errors
/// Returns an error if the descriptor cannot be written or the packager fails.
pub fn pack(
    descriptor: &PackageDescriptor,
    output_dir: &Path,
    packager: &dyn ExternalTool,
) -> Result<PathBuf, EngineError> {
    kiln_util::fs::ensure_dir(output_dir)?;
    let path = descriptor_path(output_dir, &descriptor.id);
    descriptor.write_to(&path)?;

    let args = PackCommand::new()
        .descriptor(&path)
        .output_dir(output_dir)
        .build_args()?;
    tracing::info!(package = %descriptor.id, version = %descriptor.version, "packing");
    run_checked(packager, &args)?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use kiln_tools::ToolError;

    use super::*;

    struct FakePackager {
        code: i32,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ExternalTool for FakePackager {
        fn name(&self) -> &str {
            "nuget"
        }

        fn invoke(&self, args: &[String]) -> Result<i32, ToolError> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(self.code)
        }
    }

    fn descriptor() -> PackageDescriptor {
        PackageDescriptor {
            id: "Automatonymous".to_owned(),
            version: "0.4.2.0".to_owned(),
            authors: "Chris Patterson".to_owned(),
            description: "State machines".to_owned(),
            title: "Automatonymous".to_owned(),
            project_url: None,
            license_url: None,
            language: None,
            require_license_acceptance: false,
            dependencies: Vec::new(),
            files: Vec::new(),
        }
    }

    #[test]
    fn pack_writes_descriptor_and_invokes_packager() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("artifacts");
        let packager = FakePackager {
            code: 0,
            calls: RefCell::new(Vec::new()),
        };

        let path = pack(&descriptor(), &out, &packager).unwrap();
        assert_eq!(path, out.join("Automatonymous.nuspec"));
        assert!(path.is_file());

        let calls = packager.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                "pack".to_owned(),
                path.display().to_string(),
                "-OutputDirectory".to_owned(),
                out.display().to_string(),
            ]
        );
    }

    #[test]
    fn pack_propagates_packager_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let packager = FakePackager {
            code: 1,
            calls: RefCell::new(Vec::new()),
        };
        let err = pack(&descriptor(), tmp.path(), &packager).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Tool(ToolError::Failed { code: 1, .. })
        ));
    }
}
