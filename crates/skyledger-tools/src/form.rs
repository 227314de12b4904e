//! Manual entry path: a filled-in location form straight to the ledger

use crate::oracle::ObservationSource;
use skyledger_chain::IngestionCoordinator;
use skyledger_core::{Block, Error, LocationDescriptor, Result};
use tracing::info;

/// Raw form fields as typed by the user.
#[derive(Clone, Debug, Default)]
pub struct FormInput {
    pub country: String,
    pub state: String,
    pub district: String,
}

impl FormInput {
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        district: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            district: district.into(),
        }
    }

    /// Parse `country|state|district`.
    pub fn parse_pipe(line: &str) -> Result<Self> {
        let mut parts = line.splitn(3, '|').map(str::trim);
        let form = Self::new(
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
        );
        form.validate()?;
        Ok(form)
    }

    /// Every field is required. Values are otherwise taken verbatim.
    pub fn validate(&self) -> Result<LocationDescriptor> {
        if self.country.trim().is_empty() {
            return Err(Error::IncompleteForm("country"));
        }
        if self.state.trim().is_empty() {
            return Err(Error::IncompleteForm("state"));
        }
        if self.district.trim().is_empty() {
            return Err(Error::IncompleteForm("district"));
        }
        Ok(LocationDescriptor::new(&self.country, &self.state, &self.district))
    }
}

#[derive(Clone, Debug)]
pub struct ManualEntry {
    source: ObservationSource,
    coordinator: IngestionCoordinator,
}

impl ManualEntry {
    pub fn new(source: ObservationSource, coordinator: IngestionCoordinator) -> Self {
        Self { source, coordinator }
    }

    /// Validate the form, fetch the weather, append a block.
    /// On any failure the ledger is untouched.
    pub async fn submit(&self, form: &FormInput) -> Result<Block> {
        let location = form.validate()?;
        let pending = self.source.observe(&location).await?;
        let block = self.coordinator.submit(pending).await?;
        info!(sequence_id = block.sequence_id, "Form appended weather for {}", block.location);
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_first_missing_field() {
        assert!(matches!(
            FormInput::new("Chile", "", "").validate(),
            Err(Error::IncompleteForm("state"))
        ));
        assert!(matches!(
            FormInput::new("Chile", "Biobio", " ").validate(),
            Err(Error::IncompleteForm("district"))
        ));
        assert!(matches!(
            FormInput::default().validate(),
            Err(Error::IncompleteForm("country"))
        ));
    }

    #[test]
    fn parse_pipe_trims_fields() {
        let form = FormInput::parse_pipe(" Japan | Tokyo |Shibuya ").unwrap();
        assert_eq!(form.country, "Japan");
        assert_eq!(form.state, "Tokyo");
        assert_eq!(form.district, "Shibuya");
        assert!(FormInput::parse_pipe("Japan|Tokyo").is_err());
    }
}
