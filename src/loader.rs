//! Loader binding: consumed, not implemented. Dynamically loads a Tier-3
//! module by name and invokes its `run`/`main`/`default` entry point.

use async_trait::async_trait;

#[derive(Debug)]
pub struct LoaderError(pub String);

/// A loaded module, callable with argv.
#[async_trait]
pub trait LoadedModule: Send + Sync {
    async fn invoke(&self, args: &[String]) -> Result<(String, String, i32), LoaderError>;
}

/// One loader-backed capability: a named set of modules it can load.
#[async_trait]
pub trait LoaderBinding: Send + Sync {
    fn name(&self) -> &str;
    fn modules(&self) -> &[String];
    async fn load(&self, module: &str) -> Result<Box<dyn LoadedModule>, LoaderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeModule;

    #[async_trait]
    impl LoadedModule for FakeModule {
        async fn invoke(&self, args: &[String]) -> Result<(String, String, i32), LoaderError> {
            Ok((format!("invoked with {} args", args.len()), String::new(), 0))
        }
    }

    struct FakeLoader {
        name: String,
        modules: Vec<String>,
    }

    #[async_trait]
    impl LoaderBinding for FakeLoader {
        fn name(&self) -> &str {
            &self.name
        }
        fn modules(&self) -> &[String] {
            &self.modules
        }
        async fn load(&self, module: &str) -> Result<Box<dyn LoadedModule>, LoaderError> {
            if self.modules.contains(&module.to_string()) {
                Ok(Box::new(FakeModule))
            } else {
                Err(LoaderError(format!("no such module: {module}")))
            }
        }
    }

    #[tokio::test]
    async fn loads_known_module_and_invokes_it() {
        let loader = FakeLoader { name: "plugins".into(), modules: vec!["plugin-x".into()] };
        let module = loader.load("plugin-x").await.unwrap();
        let (stdout, _, exit_code) = module.invoke(&["a".into()]).await.unwrap();
        assert_eq!(exit_code, 0);
        assert!(stdout.contains('1'));
    }

    #[tokio::test]
    async fn unknown_module_errors() {
        let loader = FakeLoader { name: "plugins".into(), modules: vec![] };
        assert!(loader.load("missing").await.is_err());
    }
}
