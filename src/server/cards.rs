use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{rejected, AppState};
use crate::error::{BoardError, Result};
use crate::model::card::NewCard;
use crate::model::record::{CardList, CardPatchRecord, CardRecord, NewCardRecord};

pub async fn list_cards(State(state): State<AppState>) -> Result<Json<CardList>> {
    let cards = state.service.list_cards()?;
    Ok(Json(CardList {
        cards: cards.into_iter().map(CardRecord::from).collect(),
    }))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CardRecord>> {
    Ok(Json(state.service.get_card(&id)?.into()))
}

/// 201 for a new card; 200 when the issue was already placed and the existing
/// card was moved instead.
pub async fn create_card(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewCardRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<CardRecord>)> {
    let Json(record) = body.map_err(rejected)?;
    if record.id.is_some() {
        return Err(BoardError::Validation(
            "id is assigned by the server".into(),
        ));
    }
    let (card, created) = state.service.create_card(NewCard::try_from(record)?)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(card.into())))
}

pub async fn create_batch(
    State(state): State<AppState>,
    body: std::result::Result<Json<Vec<NewCardRecord>>, JsonRejection>,
) -> Result<(StatusCode, Json<CardList>)> {
    let Json(records) = body.map_err(rejected)?;
    let cards = records
        .into_iter()
        .map(NewCard::try_from)
        .collect::<Result<Vec<_>>>()?;
    let created = state.service.create_batch(cards)?;
    Ok((
        StatusCode::CREATED,
        Json(CardList {
            cards: created.into_iter().map(CardRecord::from).collect(),
        }),
    ))
}

pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<CardPatchRecord>, JsonRejection>,
) -> Result<Json<CardRecord>> {
    let Json(patch) = body.map_err(rejected)?;
    let card = state.service.update_card(&id, patch.into())?;
    Ok(Json(card.into()))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.service.delete_card(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
