//! Flight search dialogue as an explicit state machine.
//!
//! Each chat has one [`FlightDialogueState`] stored by teloxide's
//! `InMemStorage`. [`advance`] consumes one user message and returns the next
//! state plus what the transport should do. It touches no I/O, so the whole
//! conversation can be exercised in tests. A chat that goes quiet simply
//! leaves its state behind; the next menu button resets it.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::dates::parse_iso_date;

/// Words that mean "no return date" at the return-date prompt
pub const SKIP_WORDS: &[&str] = &["-", "skip", "нет", "пропустить"];

/// Conversation state per chat
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightDialogueState {
    #[default]
    Idle,
    AwaitingOrigin,
    AwaitingDestination {
        origin: String,
    },
    AwaitingDepartDate {
        origin: String,
        destination: String,
    },
    AwaitingReturnDate {
        origin: String,
        destination: String,
        depart_date: String,
    },
    AwaitingWeatherCity,
}

/// Type alias for the flight dialogue
pub type FlightDialogue = Dialogue<FlightDialogueState, InMemStorage<FlightDialogueState>>;

/// A fully collected search request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub depart_date: String,
    /// `None` when the user skipped the return date
    pub return_date: Option<String>,
}

/// Which question to ask next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    Origin,
    Destination,
    DepartDate,
    ReturnDate,
    WeatherCity,
}

/// Why an input was refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    EmptyCity,
    InvalidDate,
    ReturnBeforeDepart { depart_date: String },
    InvalidWeatherCity,
}

/// What the transport should do after a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Input accepted, ask the next question
    Ask(Prompt),
    /// Input refused, explain and ask the same question again
    Reprompt { prompt: Prompt, reason: Rejection },
    /// Dialogue complete, run the search
    Search(SearchQuery),
    /// Weather city collected
    Weather(String),
    /// No dialogue in progress
    Ignored,
}

/// Next state plus outcome
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: FlightDialogueState,
    pub outcome: StepOutcome,
}

impl Transition {
    fn ask(next: FlightDialogueState, prompt: Prompt) -> Self {
        Self {
            next,
            outcome: StepOutcome::Ask(prompt),
        }
    }

    fn reprompt(state: FlightDialogueState, prompt: Prompt, reason: Rejection) -> Self {
        Self {
            next: state,
            outcome: StepOutcome::Reprompt { prompt, reason },
        }
    }
}

/// Entry trigger for "begin search"
pub fn begin_search() -> Transition {
    Transition::ask(FlightDialogueState::AwaitingOrigin, Prompt::Origin)
}

/// Entry trigger for the weather lookup
pub fn begin_weather() -> Transition {
    Transition::ask(FlightDialogueState::AwaitingWeatherCity, Prompt::WeatherCity)
}

/// Validates a city name input
pub fn validate_city(input: &str) -> Result<String, Rejection> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Rejection::EmptyCity);
    }
    Ok(trimmed.to_string())
}

/// Validates a weather city: non-empty and not only digits
pub fn validate_weather_city(input: &str) -> Result<String, Rejection> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(Rejection::InvalidWeatherCity);
    }
    Ok(trimmed.to_string())
}

/// Parse the return-date answer: `Ok(None)` for a skip
pub fn parse_return_answer(input: &str, depart_date: &str) -> Result<Option<String>, Rejection> {
    let trimmed = input.trim();
    if trimmed.is_empty() || SKIP_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        return Ok(None);
    }
    let ret = parse_iso_date(trimmed).map_err(|_| Rejection::InvalidDate)?;
    if let Ok(depart) = parse_iso_date(depart_date) {
        if ret < depart {
            return Err(Rejection::ReturnBeforeDepart {
                depart_date: depart_date.to_string(),
            });
        }
    }
    Ok(Some(trimmed.to_string()))
}

/// Consume one message in the given state
pub fn advance(state: FlightDialogueState, input: &str) -> Transition {
    match &state {
        FlightDialogueState::Idle => Transition {
            next: FlightDialogueState::Idle,
            outcome: StepOutcome::Ignored,
        },
        FlightDialogueState::AwaitingOrigin => match validate_city(input) {
            Ok(origin) => Transition::ask(
                FlightDialogueState::AwaitingDestination { origin },
                Prompt::Destination,
            ),
            Err(reason) => Transition::reprompt(state.clone(), Prompt::Origin, reason),
        },
        FlightDialogueState::AwaitingDestination { origin } => match validate_city(input) {
            Ok(destination) => Transition::ask(
                FlightDialogueState::AwaitingDepartDate {
                    origin: origin.clone(),
                    destination,
                },
                Prompt::DepartDate,
            ),
            Err(reason) => Transition::reprompt(state.clone(), Prompt::Destination, reason),
        },
        FlightDialogueState::AwaitingDepartDate {
            origin,
            destination,
        } => {
            let depart_date = input.trim();
            if parse_iso_date(depart_date).is_err() {
                return Transition::reprompt(state.clone(), Prompt::DepartDate, Rejection::InvalidDate);
            }
            Transition::ask(
                FlightDialogueState::AwaitingReturnDate {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    depart_date: depart_date.to_string(),
                },
                Prompt::ReturnDate,
            )
        }
        FlightDialogueState::AwaitingReturnDate {
            origin,
            destination,
            depart_date,
        } => match parse_return_answer(input, depart_date) {
            Ok(return_date) => Transition {
                next: FlightDialogueState::Idle,
                outcome: StepOutcome::Search(SearchQuery {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    depart_date: depart_date.clone(),
                    return_date,
                }),
            },
            Err(reason) => Transition::reprompt(state.clone(), Prompt::ReturnDate, reason),
        },
        FlightDialogueState::AwaitingWeatherCity => match validate_weather_city(input) {
            Ok(city) => Transition {
                next: FlightDialogueState::Idle,
                outcome: StepOutcome::Weather(city),
            },
            Err(reason) => Transition::reprompt(state.clone(), Prompt::WeatherCity, reason),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_validation() {
        assert_eq!(validate_city("  Москва "), Ok("Москва".to_string()));
        assert_eq!(validate_city("   "), Err(Rejection::EmptyCity));
    }

    #[test]
    fn test_weather_city_validation() {
        assert!(validate_weather_city("Paris").is_ok());
        assert_eq!(validate_weather_city("12345"), Err(Rejection::InvalidWeatherCity));
        assert_eq!(validate_weather_city(""), Err(Rejection::InvalidWeatherCity));
    }

    #[test]
    fn test_return_answer_skip_words() {
        for skip in ["", "-", "Skip", "нет", "Пропустить"] {
            assert_eq!(parse_return_answer(skip, "2025-06-01"), Ok(None), "{skip:?}");
        }
    }

    #[test]
    fn test_return_answer_validation() {
        assert_eq!(
            parse_return_answer("2025-06-10", "2025-06-01"),
            Ok(Some("2025-06-10".to_string()))
        );
        assert_eq!(parse_return_answer("2025-06-31", "2025-06-01"), Err(Rejection::InvalidDate));
        assert_eq!(
            parse_return_answer("2025-05-30", "2025-06-01"),
            Err(Rejection::ReturnBeforeDepart {
                depart_date: "2025-06-01".to_string()
            })
        );
    }

    #[test]
    fn test_idle_ignores_input() {
        let step = advance(FlightDialogueState::Idle, "hello");
        assert_eq!(step.next, FlightDialogueState::Idle);
        assert_eq!(step.outcome, StepOutcome::Ignored);
    }
}
