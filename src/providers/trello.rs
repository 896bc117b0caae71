use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use super::{BoardService, CardMove, CheckItemUpdate};
use crate::error::SyncError;
use crate::model::board::{
    Board, BoardList, Card, CardSummary, CheckItem, CheckState, Checklist, Label,
};

const TRELLO_API_BASE: &str = "https://api.trello.com/1";

pub struct TrelloClient {
    api_key: String,
    token: String,
    client: reqwest::Client,
    base_url: String,
}

impl TrelloClient {
    pub fn new(api_key: String, token: String) -> Self {
        Self::with_base_url(api_key, token, TRELLO_API_BASE)
    }

    pub fn with_base_url(api_key: String, token: String, base_url: &str) -> Self {
        Self {
            api_key,
            token,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_params(&self) -> [(&str, &str); 2] {
        [("key", self.api_key.as_str()), ("token", self.token.as_str())]
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .query(&self.auth_params())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .query(&self.auth_params())
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.client
            .put(format!("{}{path}", self.base_url))
            .query(&self.auth_params())
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client
            .delete(format!("{}{path}", self.base_url))
            .query(&self.auth_params())
    }
}

async fn execute(request: RequestBuilder, operation: &str) -> Result<Response, SyncError> {
    let resp = request
        .send()
        .await
        .map_err(|e| SyncError::remote(operation, e))?;
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SyncError::not_found("trello resource", operation));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::remote(operation, format!("{status}: {body}")));
    }
    Ok(resp)
}

async fn fetch<T: DeserializeOwned>(request: RequestBuilder, operation: &str) -> Result<T, SyncError> {
    execute(request, operation)
        .await?
        .json()
        .await
        .map_err(|e| SyncError::remote(operation, e))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrelloBoard {
    id: String,
    name: String,
    short_link: Option<String>,
}

#[derive(Deserialize)]
struct TrelloList {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct TrelloLabel {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct TrelloCardSummary {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrelloCheckItem {
    id: String,
    name: String,
    state: CheckState,
    #[serde(default)]
    pos: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrelloChecklist {
    id: String,
    name: String,
    #[serde(default)]
    pos: f64,
    #[serde(default)]
    check_items: Vec<TrelloCheckItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrelloCard {
    id: String,
    name: String,
    url: Option<String>,
    short_url: Option<String>,
    id_board: String,
    list: Option<TrelloList>,
    #[serde(default)]
    checklists: Vec<TrelloChecklist>,
    #[serde(default)]
    labels: Vec<TrelloLabel>,
}

impl From<TrelloList> for BoardList {
    fn from(list: TrelloList) -> Self {
        BoardList {
            id: list.id,
            name: list.name,
        }
    }
}

impl From<TrelloLabel> for Label {
    fn from(label: TrelloLabel) -> Self {
        Label {
            id: label.id,
            name: label.name,
        }
    }
}

impl From<TrelloChecklist> for Checklist {
    fn from(checklist: TrelloChecklist) -> Self {
        let mut check_items = checklist.check_items;
        check_items.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        Checklist {
            id: checklist.id,
            name: checklist.name,
            items: check_items
                .into_iter()
                .map(|item| CheckItem {
                    id: item.id,
                    name: item.name,
                    state: item.state,
                })
                .collect(),
        }
    }
}

impl From<TrelloCard> for Card {
    fn from(card: TrelloCard) -> Self {
        let mut checklists = card.checklists;
        checklists.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        Card {
            url: card.url.or(card.short_url).unwrap_or_default(),
            id: card.id,
            name: card.name,
            board_id: card.id_board,
            list: card.list.map(BoardList::from),
            checklists: checklists.into_iter().map(Checklist::from).collect(),
            labels: card
                .labels
                .into_iter()
                .filter(|l| !l.name.is_empty())
                .map(Label::from)
                .collect(),
        }
    }
}

#[async_trait]
impl BoardService for TrelloClient {
    #[instrument(skip(self), level = "debug")]
    async fn board(&self, reference: &str) -> Result<Board, SyncError> {
        let boards: Vec<TrelloBoard> = fetch(
            self.get("/members/me/boards")
                .query(&[("fields", "id,name,shortLink"), ("filter", "open")]),
            "list boards",
        )
        .await?;

        boards
            .into_iter()
            .find(|b| {
                b.id == reference
                    || b.short_link.as_deref() == Some(reference)
                    || b.name == reference
            })
            .map(|b| Board {
                id: b.id,
                name: b.name,
            })
            .ok_or_else(|| SyncError::not_found("board", reference))
    }

    async fn lists(&self, board_id: &str) -> Result<Vec<BoardList>, SyncError> {
        let lists: Vec<TrelloList> = fetch(
            self.get(&format!("/boards/{board_id}/lists"))
                .query(&[("fields", "id,name"), ("filter", "open")]),
            &format!("list lists of board {board_id}"),
        )
        .await?;
        Ok(lists.into_iter().map(BoardList::from).collect())
    }

    async fn cards(&self, list_id: &str) -> Result<Vec<CardSummary>, SyncError> {
        let cards: Vec<TrelloCardSummary> = fetch(
            self.get(&format!("/lists/{list_id}/cards"))
                .query(&[("fields", "id,name")]),
            &format!("list cards of list {list_id}"),
        )
        .await?;
        Ok(cards
            .into_iter()
            .map(|c| CardSummary {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn card(&self, card_id: &str) -> Result<Card, SyncError> {
        let card: TrelloCard = fetch(
            self.get(&format!("/cards/{card_id}")).query(&[
                ("fields", "id,name,url,shortUrl,idBoard,labels"),
                ("checklists", "all"),
                ("list", "true"),
            ]),
            &format!("fetch card {card_id}"),
        )
        .await?;
        Ok(card.into())
    }

    async fn create_checklist(&self, card_id: &str, name: &str) -> Result<Checklist, SyncError> {
        let checklist: TrelloChecklist = fetch(
            self.post(&format!("/cards/{card_id}/checklists"))
                .query(&[("name", name)]),
            &format!("create checklist {name:?} on card {card_id}"),
        )
        .await?;
        Ok(checklist.into())
    }

    async fn update_check_item(
        &self,
        card_id: &str,
        item_id: &str,
        update: CheckItemUpdate,
    ) -> Result<(), SyncError> {
        let request = self.put(&format!("/cards/{card_id}/checkItem/{item_id}"));
        let request = match &update {
            CheckItemUpdate::State(state) => request.query(&[("state", state.as_str())]),
            CheckItemUpdate::MoveTo { checklist_id } => request.query(&[
                ("idChecklist", checklist_id.as_str()),
                ("pos", "bottom"),
            ]),
        };
        execute(request, &format!("update check item {item_id} on card {card_id}")).await?;
        Ok(())
    }

    async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>, SyncError> {
        let labels: Vec<TrelloLabel> = fetch(
            self.get(&format!("/boards/{board_id}/labels"))
                .query(&[("fields", "id,name")]),
            &format!("list labels of board {board_id}"),
        )
        .await?;
        Ok(labels.into_iter().map(Label::from).collect())
    }

    async fn add_label(&self, card_id: &str, label_id: &str) -> Result<(), SyncError> {
        execute(
            self.post(&format!("/cards/{card_id}/idLabels"))
                .query(&[("value", label_id)]),
            &format!("add label {label_id} to card {card_id}"),
        )
        .await?;
        Ok(())
    }

    async fn remove_label(&self, card_id: &str, label_id: &str) -> Result<(), SyncError> {
        execute(
            self.delete(&format!("/cards/{card_id}/idLabels/{label_id}")),
            &format!("remove label {label_id} from card {card_id}"),
        )
        .await?;
        Ok(())
    }

    async fn move_card(&self, card_id: &str, destination: CardMove) -> Result<(), SyncError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(board_id) = &destination.board_id {
            params.push(("idBoard", board_id.as_str()));
        }
        if let Some(list_id) = &destination.list_id {
            params.push(("idList", list_id.as_str()));
        }
        execute(
            self.put(&format!("/cards/{card_id}")).query(&params),
            &format!("move card {card_id}"),
        )
        .await?;
        Ok(())
    }
}
