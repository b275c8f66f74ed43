//! HTTP client for the Trello REST API.

use crate::config::TrelloConfig;
use crate::fields;
use crate::model::{Attachment, Card, CommentAction, CustomFieldDef, CustomFieldItem};
use crate::url::parse_download_url;
use async_trait::async_trait;
use boardsync_core::RecordKind;
use boardsync_engine::{
    DownloadedAttachment, EngineError, EngineResult, RawAttachment, RawComment, RawEntity,
    RawLabel, SourceClient,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const MAX_ERROR_BODY: usize = 200;

/// Reads cards from Trello boards and downloads their attachments.
///
/// Every call makes a single attempt. Cards without custom field values are
/// skipped since they carry no record data.
#[derive(Debug, Clone)]
pub struct TrelloClient {
    config: TrelloConfig,
    http: reqwest::Client,
}

impl TrelloClient {
    /// Creates a client.
    pub fn new(config: TrelloConfig) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("boardsync/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                EngineError::source_failure(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self { config, http })
    }

    /// The client configuration.
    pub fn config(&self) -> &TrelloConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> EngineResult<T> {
        let url = format!("{}/{}", self.config.base_url, path.trim_start_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("token", self.config.token.as_str()),
            ])
            .query(query)
            .send()
            .await
            .map_err(|err| EngineError::source_failure(format!("GET {path} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::source_failure(format!(
                "GET {path} returned HTTP {status}: {}",
                truncate_for_error(&body)
            )));
        }

        response.json::<T>().await.map_err(|err| {
            EngineError::source_failure(format!("GET {path} returned an unreadable body: {err}"))
        })
    }

    async fn custom_field_definitions(
        &self,
        board_id: &str,
    ) -> EngineResult<HashMap<String, CustomFieldDef>> {
        let defs: Vec<CustomFieldDef> = self
            .get_json(&format!("boards/{board_id}/customFields"), &[])
            .await?;
        Ok(defs.into_iter().map(|def| (def.id.clone(), def)).collect())
    }

    async fn card_entity(
        &self,
        kind: RecordKind,
        definitions: &HashMap<String, CustomFieldDef>,
        card: Card,
    ) -> EngineResult<Option<RawEntity>> {
        let items: Vec<CustomFieldItem> = self
            .get_json(&format!("cards/{}/customFieldItems", card.id), &[])
            .await?;
        if items.is_empty() {
            tracing::debug!(card_id = %card.id, "skipping card without custom fields");
            return Ok(None);
        }

        let attachments: Vec<Attachment> = self
            .get_json(&format!("cards/{}/attachments", card.id), &[])
            .await?;
        let comments: Vec<CommentAction> = self
            .get_json(
                &format!("cards/{}/actions", card.id),
                &[("filter", "commentCard")],
            )
            .await?;

        let fields = fields::resolve(definitions, &items).into_attributes(kind, &card.name);
        Ok(Some(RawEntity {
            id: card.id,
            name: card.name,
            last_activity: card.date_last_activity,
            fields,
            labels: card
                .labels
                .into_iter()
                .map(|l| RawLabel {
                    id: l.id,
                    name: l.name,
                })
                .collect(),
            attachments: attachments
                .into_iter()
                .filter(|a| !a.url.is_empty())
                .map(|a| RawAttachment {
                    id: a.id,
                    url: a.url,
                    name: a.name,
                })
                .collect(),
            comments: comments
                .into_iter()
                .map(|c| RawComment { text: c.data.text })
                .collect(),
        }))
    }
}

#[async_trait]
impl SourceClient for TrelloClient {
    async fn fetch_entities(
        &self,
        kind: RecordKind,
        board_id: &str,
    ) -> EngineResult<Vec<RawEntity>> {
        let definitions = self.custom_field_definitions(board_id).await?;
        let cards: Vec<Card> = self.get_json(&format!("boards/{board_id}/cards"), &[]).await?;
        tracing::debug!(
            board_id,
            cards = cards.len(),
            fields = definitions.len(),
            "fetched board"
        );

        let mut entities = Vec::with_capacity(cards.len());
        for card in cards {
            if let Some(entity) = self.card_entity(kind, &definitions, card).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    async fn download_attachment(&self, url: &str) -> EngineResult<DownloadedAttachment> {
        let target = parse_download_url(url)
            .ok_or_else(|| EngineError::download(url, "not a card attachment download url"))?;

        let endpoint = format!(
            "{}/cards/{}/attachments/{}/download",
            self.config.base_url, target.card_id, target.attachment_id
        );
        let authorization = format!(
            "OAuth oauth_consumer_key=\"{}\", oauth_token=\"{}\"",
            self.config.api_key,
            self.config.effective_download_token()
        );
        let response = self
            .http
            .get(&endpoint)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| EngineError::download(url, err.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(EngineError::download(url, format!("HTTP {status}")));
        }
        let payload = response
            .bytes()
            .await
            .map_err(|err| EngineError::download(url, err.to_string()))?;

        tokio::fs::create_dir_all(&self.config.download_dir).await?;
        let local_path = self.config.download_dir.join(format!(
            "{}-{}{}",
            uuid::Uuid::new_v4().simple(),
            target.attachment_id,
            target.extension
        ));
        tokio::fs::write(&local_path, &payload).await?;
        tracing::debug!(url, path = %local_path.display(), bytes = payload.len(), "downloaded attachment");

        Ok(DownloadedAttachment {
            local_path,
            identifier: target.attachment_id,
            extension: target.extension,
        })
    }
}

fn truncate_for_error(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_ERROR_BODY).collect::<String>())
    }
}
