use async_trait::async_trait;
use std::time::Duration;

use super::wire::{BlockRef, FirstBlockRequest, FirstBlockResponse};
use super::StartBlockResolver;
use crate::error::ResolutionError;
use crate::types::{ResolutionOutcome, StartBlock, WalletAddressSet};

/// HTTP client for the earliest-block index
pub struct IndexResolver {
    client: reqwest::Client,
    base_url: String,
}

impl IndexResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Blocks touching any of `addresses`, plus the tip if requested
    pub async fn first_blocks(
        &self,
        addresses: &WalletAddressSet,
        best_block_fallback: bool,
    ) -> Result<FirstBlockResponse, ResolutionError> {
        let url = format!("{}/wallet/first-block", self.base_url);
        let request = FirstBlockRequest {
            addresses: addresses.as_slice().to_vec(),
            best_block_fallback,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(ResolutionError::Status(response.status().as_u16()));
        }
        let body = response.json::<FirstBlockResponse>().await?;
        Ok(body)
    }

    /// Current chain tip
    pub async fn best_block(&self) -> Result<BlockRef, ResolutionError> {
        let url = format!("{}/blocks/tip", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ResolutionError::Status(response.status().as_u16()));
        }
        let tip = response.json::<BlockRef>().await?;
        Ok(tip)
    }

    async fn resolve_inner(
        &self,
        addresses: &WalletAddressSet,
        allow_best_block_fallback: bool,
    ) -> Result<Option<StartBlock>, ResolutionError> {
        let mut inline_tip = None;

        if !addresses.is_empty() {
            let response = self.first_blocks(addresses, allow_best_block_fallback).await?;
            if let Some(block) = response.earliest()? {
                log::info!("Earliest block with wallet transactions: {}", block);
                return Ok(Some(block));
            }
            inline_tip = response.best_block;
        }

        if !allow_best_block_fallback {
            return Ok(None);
        }

        let tip = match inline_tip {
            Some(tip) => tip,
            None => self.best_block().await?,
        };
        let block = tip.to_start_block()?;
        if let Some(block) = &block {
            log::info!("No wallet history, starting at best block {}", block);
        }
        Ok(block)
    }
}

#[async_trait]
impl StartBlockResolver for IndexResolver {
    async fn resolve(
        &self,
        addresses: WalletAddressSet,
        allow_best_block_fallback: bool,
        timeout: Duration,
    ) -> ResolutionOutcome {
        log::debug!(
            "Resolving start block for {} addresses via {} (fallback: {}, timeout: {:?})",
            addresses.len(),
            self.base_url,
            allow_best_block_fallback,
            timeout
        );

        let result = tokio::time::timeout(
            timeout,
            self.resolve_inner(&addresses, allow_best_block_fallback),
        )
        .await;

        match result {
            Ok(Ok(Some(block))) => ResolutionOutcome::Resolved(block),
            Ok(Ok(None)) => ResolutionOutcome::NotFound,
            Ok(Err(e)) => ResolutionOutcome::Failed(e),
            Err(_) => ResolutionOutcome::Failed(ResolutionError::Timeout(timeout)),
        }
    }
}
