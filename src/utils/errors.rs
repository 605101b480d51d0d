use thiserror::Error;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error("Unknown game: {game_id}")]
    UnknownGame { game_id: String },

    #[error("Quiz data error: {message}")]
    QuizData { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl GameError {
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn unknown_game<S: Into<String>>(game_id: S) -> Self {
        Self::UnknownGame {
            game_id: game_id.into(),
        }
    }

    pub fn quiz_data<S: Into<String>>(message: S) -> Self {
        Self::QuizData {
            message: message.into(),
        }
    }

    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = GameError::persistence("disk full");
        assert!(matches!(error, GameError::Persistence { .. }));
        assert_eq!(error.to_string(), "Persistence error: disk full");
    }

    #[test]
    fn test_unknown_game_error() {
        let error = GameError::unknown_game("pong");
        assert!(matches!(error, GameError::UnknownGame { .. }));
        assert_eq!(error.to_string(), "Unknown game: pong");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: GameError = io.into();
        assert!(matches!(error, GameError::Io(_)));
    }
}
