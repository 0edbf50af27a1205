use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Once;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Структурированная запись лога в JSON формате
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredLogEntry {
    /// Временная метка в ISO 8601 формате
    pub timestamp: String,
    /// Уровень логирования
    pub level: String,
    /// Целевой модуль/компонент
    pub target: String,
    /// Основное сообщение
    pub message: String,
    /// Дополнительные поля (имя injectable, scope, и т.д.)
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

/// Форматтер для JSON логов
pub struct JsonFormatter;

impl<S> Layer<S> for JsonFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let level = match *event.metadata().level() {
            Level::ERROR => "ERROR",
            Level::WARN => "WARN",
            Level::INFO => "INFO",
            Level::DEBUG => "DEBUG",
            Level::TRACE => "TRACE",
        };

        let entry = StructuredLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };

        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(io::stdout(), "{}", json);
        }
    }
}

/// Визитор для извлечения полей из события
#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: HashMap<String, Value>,
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                Value::String(format!("{:?}", value)),
            );
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), Value::Number(value.into()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), Value::Bool(value));
    }
}

/// Конфигурация логирования
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Минимальный уровень логирования (директива для `EnvFilter`)
    pub level: String,
    /// Вывод в JSON формате
    pub json_output: bool,
    /// Включить цветной вывод (только для non-JSON)
    pub color_output: bool,
    /// Включить номера строк
    pub include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_output: false,
            color_output: true,
            include_line_numbers: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    /// Конфигурация логирования из конфигурации контейнера
    pub fn from_injector_config(config: &crate::config::InjectorConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            json_output: config.json_logs,
            ..Self::default()
        }
    }
}

/// Инициализировать глобальный subscriber.
///
/// `RUST_LOG` имеет приоритет над `config.level`.
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json_output {
        let subscriber = Registry::default().with(env_filter).with(JsonFormatter);

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_line_number(config.include_line_numbers)
            .with_ansi(config.color_output);

        let subscriber = Registry::default().with(env_filter).with(fmt_layer);

        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

static TEST_LOGGING: Once = Once::new();

/// Subscriber для тестов: пишет через test writer, безопасно вызывать многократно.
pub fn try_init_test_logging() {
    TEST_LOGGING.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_from_injector_config() {
        let mut injector_config = crate::config::InjectorConfig::default();
        injector_config.log_level = "trace".to_string();
        injector_config.json_logs = true;

        let config = LoggingConfig::from_injector_config(&injector_config);
        assert_eq!(config.level, "trace");
        assert!(config.json_output);
    }

    #[test]
    fn test_json_visitor_collects_fields() {
        let mut visitor = JsonVisitor::default();
        visitor.message = Some("resolved".to_string());
        visitor
            .fields
            .insert("injectable".to_string(), Value::String("clock".to_string()));

        let entry = StructuredLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: "DEBUG".to_string(),
            target: "injector".to_string(),
            message: visitor.message.clone().unwrap_or_default(),
            fields: visitor.fields.clone(),
        };

        let json = serde_json::to_value(&entry).expect("entry serializes");
        assert_eq!(json["message"], "resolved");
        assert_eq!(json["injectable"], "clock");
    }

    #[test]
    fn test_try_init_test_logging_is_idempotent() {
        try_init_test_logging();
        try_init_test_logging();
        tracing::debug!("test logging initialized twice without panicking");
    }
}
