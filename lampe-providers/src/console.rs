//! Console sink: prints artifacts to stdout.

use tracing::info;

use crate::errors::ProviderResult;
use crate::payloads::{PRDescriptionPayload, PRReviewPayload};

#[derive(Debug, Default)]
pub struct ConsoleProvider;

impl ConsoleProvider {
    pub fn deliver_pr_description(&self, payload: &PRDescriptionPayload) -> ProviderResult<()> {
        println!("{}", payload.description);
        Ok(())
    }

    pub fn deliver_pr_review(&self, payload: &PRReviewPayload) -> ProviderResult<()> {
        println!("{}", payload.review_markdown());
        Ok(())
    }

    pub fn healthcheck(&self) -> ProviderResult<()> {
        info!("✅ Console provider is healthy");
        Ok(())
    }
}
