#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    Store(assassin_core::StoreError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
            Self::Store(err) => write!(f, "server store error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<assassin_core::StoreError> for ServerError {
    fn from(value: assassin_core::StoreError) -> Self {
        Self::Store(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn from_game_error(err: GameError) -> Self {
        let status = match &err {
            GameError::NoActiveGame | GameError::PlayerNotFound | GameError::NotInGame => {
                StatusCode::NOT_FOUND
            }
            GameError::GameNotRunning
            | GameError::AlreadyRunning
            | GameError::RegistrationClosed
            | GameError::BelowMinimumPlayers { .. }
            | GameError::NoWeaponsConfigured
            | GameError::NoLocationsConfigured
            | GameError::AlreadyRegistered
            | GameError::AlreadyDead
            | GameError::NoPendingConfirmation => StatusCode::CONFLICT,
            GameError::TestModeOnly => StatusCode::BAD_REQUEST,
            GameError::ContractMissing { .. } | GameError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            error: ApiError::from_game_error(&err),
        }
    }

    fn invalid_request(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidRequest, message, details),
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<GameError> for HttpApiError {
    fn from(value: GameError) -> Self {
        Self::from_game_error(value)
    }
}
