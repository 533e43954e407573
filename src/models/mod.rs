//! Data models for PIM server

pub mod brand;
pub mod enums;
pub mod import_report;
pub mod mapping_template;
pub mod plan_run;
pub mod product;
pub mod provider;
pub mod staging;
pub mod vendor_entry;

pub use brand::{Brand, BrandSample, PendingBrand};
pub use enums::{
    AttachmentKind, AttachmentState, ErrorLineType, PendingBrandState, RunStatus, TransformType,
    UpdateMode,
};
pub use import_report::{RowOutcome, RunSummary};
pub use mapping_template::{MappingLine, MappingTemplate};
pub use plan_run::{PlanRun, RunAttachment};
pub use product::{Product, ProductMatch};
pub use provider::Provider;
pub use staging::{ImportErrorLine, ImportHistory};
pub use vendor_entry::VendorEntry;
