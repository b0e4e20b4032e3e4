#[derive(Debug, Deserialize)]
struct RegisterPlayerRequest {
    account_id: i64,
    display_name: String,
    mention: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterPlayerResponse {
    schema_version: String,
    player: PlayerRecord,
}

async fn register_player(
    State(state): State<AppState>,
    Json(request): Json<RegisterPlayerRequest>,
) -> Result<Json<RegisterPlayerResponse>, HttpApiError> {
    let display_name = request.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(HttpApiError::invalid_request(
            "display_name must not be empty",
            None,
        ));
    }
    let mention = request
        .mention
        .filter(|mention| !mention.trim().is_empty())
        .unwrap_or_else(|| display_name.clone());

    let player = {
        let mut engine = state.engine.lock().await;
        engine.register_player(request.account_id, &display_name, &mention)?
    };

    Ok(Json(RegisterPlayerResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        player,
    }))
}

#[derive(Debug, Serialize)]
struct ContractResponse {
    schema_version: String,
    contract: ContractView,
}

async fn get_contract(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ContractResponse>, HttpApiError> {
    let contract = {
        let mut engine = state.engine.lock().await;
        engine.current_contract(account_id)?
    };

    Ok(Json(ContractResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        contract,
    }))
}

#[derive(Debug, Serialize)]
struct SignalDeadResponse {
    schema_version: String,
    killer_mention: String,
    awaiting_confirmation: bool,
}

async fn signal_dead(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SignalDeadResponse>, HttpApiError> {
    let pending = {
        let mut engine = state.engine.lock().await;
        engine.signal_dead(account_id)?
    };

    Ok(Json(SignalDeadResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        killer_mention: pending.killer_mention,
        awaiting_confirmation: true,
    }))
}

async fn confirm_death(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DeathResponse>, HttpApiError> {
    let outcome = {
        let mut engine = state.engine.lock().await;
        engine.confirm_death(account_id)?
    };

    Ok(Json(DeathResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        outcome,
    }))
}

#[derive(Debug, Serialize)]
struct CancelConfirmationResponse {
    schema_version: String,
    cancelled: bool,
}

async fn cancel_confirmation(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CancelConfirmationResponse>, HttpApiError> {
    {
        let mut engine = state.engine.lock().await;
        engine.cancel_confirmation(account_id)?;
    }

    Ok(Json(CancelConfirmationResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        cancelled: true,
    }))
}
