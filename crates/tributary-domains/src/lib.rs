//! Tributary Domains - record types, generators and transforms per data domain
//!
//! Each domain pairs a raw record type (what the producer appends to the
//! object store) with an aggregate row type (what the consumer upserts into
//! the warehouse) and a pure transform between the two.

pub mod aggregate;
pub mod error;
pub mod finance;
pub mod healthcare;
pub mod ml;
pub mod synth;

use std::fmt;

use tributary_core::Format;

pub use error::TransformError;

/// One of the three independent pipeline domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Finance,
    Healthcare,
    Ml,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Finance, Domain::Healthcare, Domain::Ml];

    pub fn name(self) -> &'static str {
        match self {
            Self::Finance => "finance",
            Self::Healthcare => "healthcare",
            Self::Ml => "ml",
        }
    }

    /// Physical encoding of the domain's stored object.
    pub fn format(self) -> Format {
        match self {
            Self::Finance => Format::Csv,
            Self::Healthcare => Format::Parquet,
            Self::Ml => Format::Json,
        }
    }

    pub fn default_bucket(self) -> &'static str {
        match self {
            Self::Finance => "finance-bucket",
            Self::Healthcare => "healthcare-bucket",
            Self::Ml => "ml-bucket",
        }
    }

    pub fn default_object(self) -> &'static str {
        match self {
            Self::Finance => "finance_data.csv",
            Self::Healthcare => "healthcare_data.parquet",
            Self::Ml => "ml_data.json",
        }
    }

    /// Warehouse table receiving the domain's aggregate rows.
    pub fn table(self) -> &'static str {
        match self {
            Self::Finance => "finance_data",
            Self::Healthcare => "healthcare_data",
            Self::Ml => "ml_data",
        }
    }

    pub fn conflict_key(self) -> &'static str {
        match self {
            Self::Finance => "symbol",
            Self::Healthcare | Self::Ml => "cholesterol_level",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_warehouse::TableRow;

    #[test]
    fn table_names_match_row_types() {
        assert_eq!(Domain::Finance.table(), finance::FinanceSummary::TABLE);
        assert_eq!(Domain::Healthcare.table(), healthcare::HealthcareSummary::TABLE);
        assert_eq!(Domain::Ml.table(), ml::MlSummary::TABLE);
        assert_eq!(
            Domain::Finance.conflict_key(),
            finance::FinanceSummary::CONFLICT_KEY
        );
        assert_eq!(
            Domain::Healthcare.conflict_key(),
            healthcare::HealthcareSummary::CONFLICT_KEY
        );
        assert_eq!(Domain::Ml.conflict_key(), ml::MlSummary::CONFLICT_KEY);
    }

    #[test]
    fn default_objects_match_formats() {
        for domain in Domain::ALL {
            let ext = match domain.format() {
                Format::Csv => ".csv",
                Format::Parquet => ".parquet",
                Format::Json => ".json",
            };
            assert!(domain.default_object().ends_with(ext), "{domain}");
        }
    }
}
