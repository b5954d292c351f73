use super::{Code, CodeSystemInfo, DynTerminologyProvider, TerminologyError, TerminologyProvider, ValueSetInfo};
use async_trait::async_trait;
use log::warn;
use octofhir_cr_diagnostics::Result;
use octofhir_cr_fhir::FhirVersion;

/// Tries an ordered list of delegates for membership.
///
/// `in_value_set` walks every delegate until one reports membership;
/// failures of all but the last delegate are logged and skipped, the last
/// delegate's failure is returned. `expand` and `lookup` only consult the
/// first delegate.
pub struct PriorityTerminologyProvider {
    primary: DynTerminologyProvider,
    fallbacks: Vec<DynTerminologyProvider>,
}

impl PriorityTerminologyProvider {
    pub fn new(delegates: Vec<DynTerminologyProvider>) -> std::result::Result<Self, TerminologyError> {
        let mut delegates = delegates.into_iter();
        let primary = delegates.next().ok_or(TerminologyError::NoDelegates)?;
        let fallbacks: Vec<_> = delegates.collect();

        let expected = primary.fhir_version();
        if let Some(mismatch) = fallbacks.iter().find(|d| d.fhir_version() != expected) {
            return Err(TerminologyError::MismatchedVersions {
                expected,
                found: mismatch.fhir_version(),
            });
        }

        Ok(Self { primary, fallbacks })
    }

    pub fn len(&self) -> usize {
        1 + self.fallbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[async_trait]
impl TerminologyProvider for PriorityTerminologyProvider {
    fn fhir_version(&self) -> FhirVersion {
        self.primary.fhir_version()
    }

    async fn in_value_set(&self, code: &Code, value_set: &ValueSetInfo) -> Result<bool> {
        let last = self.len() - 1;
        let delegates = std::iter::once(&self.primary).chain(self.fallbacks.iter());

        for (index, delegate) in delegates.enumerate() {
            match delegate.in_value_set(code, value_set).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) if index < last => {
                    warn!(
                        "terminology delegate {} failed for ValueSet {}, trying next: {}",
                        index, value_set.id, err
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(false)
    }

    async fn expand(&self, value_set: &ValueSetInfo) -> Result<Vec<Code>> {
        self.primary.expand(value_set).await
    }

    async fn lookup(&self, code: &Code, code_system: &CodeSystemInfo) -> Result<Option<Code>> {
        self.primary.lookup(code, code_system).await
    }
}
