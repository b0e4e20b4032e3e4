#[derive(Debug, Deserialize)]
struct OpenRegistrationRequest {
    chat_id: i64,
}

#[derive(Debug, Serialize)]
struct OpenRegistrationResponse {
    schema_version: String,
    game: GameRecord,
}

async fn open_registration(
    State(state): State<AppState>,
    Json(request): Json<OpenRegistrationRequest>,
) -> Result<Json<OpenRegistrationResponse>, HttpApiError> {
    let game = {
        let mut engine = state.engine.lock().await;
        engine.open_registration(request.chat_id)?
    };

    Ok(Json(OpenRegistrationResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        game,
    }))
}

#[derive(Debug, Serialize)]
struct StartGameResponse {
    schema_version: String,
    summary: StartSummary,
}

async fn start_game(
    State(state): State<AppState>,
) -> Result<Json<StartGameResponse>, HttpApiError> {
    let summary = {
        let mut engine = state.engine.lock().await;
        engine.start_game()?
    };

    Ok(Json(StartGameResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        summary,
    }))
}

#[derive(Debug, Serialize)]
struct ResetGameResponse {
    schema_version: String,
    abandoned_game: GameRecord,
}

async fn reset_game(
    State(state): State<AppState>,
) -> Result<Json<ResetGameResponse>, HttpApiError> {
    let abandoned_game = {
        let mut engine = state.engine.lock().await;
        engine.reset_game()?
    };

    Ok(Json(ResetGameResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        abandoned_game,
    }))
}

#[derive(Debug, Deserialize)]
struct BeginTestGameRequest {
    chat_id: i64,
    players: Option<usize>,
}

async fn begin_test_game(
    State(state): State<AppState>,
    Json(request): Json<BeginTestGameRequest>,
) -> Result<Json<StartGameResponse>, HttpApiError> {
    let summary = {
        let mut engine = state.engine.lock().await;
        engine.begin_test_game(request.players.unwrap_or(0), request.chat_id)?
    };

    Ok(Json(StartGameResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        summary,
    }))
}

#[derive(Debug, Serialize)]
struct OverviewResponse {
    schema_version: String,
    overview: GameOverview,
}

async fn get_overview(
    State(state): State<AppState>,
) -> Result<Json<OverviewResponse>, HttpApiError> {
    let overview = {
        let mut engine = state.engine.lock().await;
        engine.overview()?
    };

    Ok(Json(OverviewResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        overview,
    }))
}

#[derive(Debug, Serialize)]
struct ReportResponse {
    schema_version: String,
    winner: PlayerRecord,
    report: String,
}

async fn get_report(State(state): State<AppState>) -> Result<Json<ReportResponse>, HttpApiError> {
    let FinalOutcome { winner, report } = {
        let mut engine = state.engine.lock().await;
        engine.latest_report()?
    };

    Ok(Json(ReportResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        winner,
        report,
    }))
}

#[derive(Debug, Deserialize)]
struct SimulateDeathRequest {
    player_id: i64,
}

#[derive(Debug, Serialize)]
struct DeathResponse {
    schema_version: String,
    outcome: DeathOutcome,
}

async fn simulate_death(
    State(state): State<AppState>,
    Json(request): Json<SimulateDeathRequest>,
) -> Result<Json<DeathResponse>, HttpApiError> {
    let outcome = {
        let mut engine = state.engine.lock().await;
        engine.simulate_death(request.player_id)?
    };

    Ok(Json(DeathResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        outcome,
    }))
}

#[derive(Debug, Serialize)]
struct PoolsResponse {
    schema_version: String,
    pools: PoolsView,
}

async fn list_pools(State(state): State<AppState>) -> Result<Json<PoolsResponse>, HttpApiError> {
    let pools = {
        let mut engine = state.engine.lock().await;
        engine.list_pools()?
    };

    Ok(Json(PoolsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        pools,
    }))
}

#[derive(Debug, Deserialize)]
struct SetPoolRequest {
    items: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SetPoolResponse {
    schema_version: String,
    update: PoolUpdate,
}

async fn set_weapons(
    State(state): State<AppState>,
    Json(request): Json<SetPoolRequest>,
) -> Result<Json<SetPoolResponse>, HttpApiError> {
    if request.items.is_empty() {
        return Err(HttpApiError::invalid_request(
            "items must not be empty",
            None,
        ));
    }

    let update = {
        let mut engine = state.engine.lock().await;
        engine.set_weapons(&request.items)?
    };

    Ok(Json(SetPoolResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        update,
    }))
}

async fn set_locations(
    State(state): State<AppState>,
    Json(request): Json<SetPoolRequest>,
) -> Result<Json<SetPoolResponse>, HttpApiError> {
    if request.items.is_empty() {
        return Err(HttpApiError::invalid_request(
            "items must not be empty",
            None,
        ));
    }

    let update = {
        let mut engine = state.engine.lock().await;
        engine.set_locations(&request.items)?
    };

    Ok(Json(SetPoolResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        update,
    }))
}
