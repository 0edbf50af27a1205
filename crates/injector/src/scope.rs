use std::fmt;

/// Время жизни экземпляра.
///
/// Порядок отражает продолжительность жизни: Singleton живёт дольше всех,
/// Prototype создаётся на каждый запрос. Потребитель не может зависеть от
/// injectable с более коротким временем жизни.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Singleton = 1,
    Application = 2,
    Prototype = 4,
}

impl Scope {
    pub fn is_cached(self) -> bool {
        matches!(self, Scope::Singleton | Scope::Application)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Singleton => "SINGLETON",
            Scope::Application => "APPLICATION",
            Scope::Prototype => "PROTOTYPE",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Способ получения экземпляра, выводится из subject при регистрации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectableType {
    /// Функция-конструктор с объявленными параметрами
    Constructed,
    /// Заранее созданное значение
    FixedValue,
    /// Provider-функция, которая сама создаёт экземпляр
    Provider,
}

impl fmt::Display for InjectableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InjectableType::Constructed => "CONSTRUCTED",
            InjectableType::FixedValue => "FIXED_VALUE",
            InjectableType::Provider => "PROVIDER",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_ordering_follows_lifetime() {
        assert!(Scope::Singleton < Scope::Application);
        assert!(Scope::Application < Scope::Prototype);
        assert_eq!(Scope::Prototype as u8, 4);
    }

    #[test]
    fn test_only_long_lived_scopes_are_cached() {
        assert!(Scope::Singleton.is_cached());
        assert!(Scope::Application.is_cached());
        assert!(!Scope::Prototype.is_cached());
    }
}
