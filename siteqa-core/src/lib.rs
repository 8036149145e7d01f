pub mod credential;
pub mod data;
pub mod error;
pub mod model;
pub mod normalize;
pub mod report;
pub mod rules;
pub mod scan;

use colored::Colorize;

pub use credential::{CredentialStore, MemoryCredentialStore};
pub use error::{FailureKind, ScanFailure, StoreError};
pub use model::{Category, Issue, Severity};
pub use normalize::{NormalizedUrl, normalize_url};
pub use report::{ReportFormat, ScanReport};
pub use scan::{ScanConfig, ScanOrchestrator, ScanState, ScanStatus};

pub fn print_banner() {
    println!(
        "{}",
        r#"
   ____  _ _        ___    _
  / ___|(_) |_ ___ / _ \  / \
  \___ \| | __/ _ \ | | |/ _ \
   ___) | | ||  __/ |_| / ___ \
  |____/|_|\__\___|\__\_\_/ \_\
"#
        .bright_cyan()
        .bold()
    );
    println!(
        "  {} {}\n",
        "website quality scanner".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
