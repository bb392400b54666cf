//! Logger and report generator wired through the container
//!
//! Run with:
//! ```sh
//! RUST_LOG=activator=trace cargo run --example report_generator --features logging-pretty
//! ```

use activator::{Arguments, Container, DiError, Lifetime, TypeCatalog, TypeInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

#[derive(Default)]
struct ConsoleLogger {
    lines: AtomicUsize,
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        let line = self.lines.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[console #{line}] {message}");
    }
}

struct ReportGenerator {
    logger: Option<Arc<dyn Logger>>,
    pages: u32,
}

impl ReportGenerator {
    fn generate(&self, title: &str) -> String {
        if let Some(logger) = &self.logger {
            logger.log(&format!("generating '{title}' ({} pages)", self.pages));
        }
        format!("{title}: {} pages", self.pages)
    }
}

fn catalog() -> TypeCatalog {
    let types = TypeCatalog::new();
    types
        .class::<ConsoleLogger>()
        .default_constructor()
        .implements::<dyn Logger>(|logger| logger as Arc<dyn Logger>);
    types
        .class::<ReportGenerator>()
        .constructor(vec![TypeInfo::of::<dyn Logger>()], |args: &Arguments| {
            Ok(ReportGenerator {
                logger: args.service(0)?,
                pages: 1,
            })
        })
        .constructor(vec![TypeInfo::of::<u32>()], |args: &Arguments| {
            Ok(ReportGenerator {
                logger: None,
                pages: args.value(0)?,
            })
        });
    types
}

fn main() -> Result<(), DiError> {
    #[cfg(feature = "logging")]
    activator::logging::init();

    let container = Container::with_catalog(catalog());
    container.register_type::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)?;
    container.register_self::<ReportGenerator>(Lifetime::Transient)?;

    let first = container.get::<ReportGenerator>()?;
    let second = container.get::<ReportGenerator>()?;
    println!("{}", first.generate("Quarterly"));
    println!("{}", second.generate("Annual"));

    // Both transients share the singleton logger
    let shared = match (&first.logger, &second.logger) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    };
    println!("logger shared: {shared}");

    // Explicit arguments select the matching constructor and bypass the lifetime
    let custom = container.get_with::<ReportGenerator>(&[activator::Instance::of(12u32)])?;
    println!("{}", custom.generate("Audit"));

    println!("registered services: {}", container.len());
    Ok(())
}
