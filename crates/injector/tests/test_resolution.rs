//! Сценарии разрешения зависимостей через публичный API контейнера

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use common::InjectorConfig;
use injector::{
    assisted, Constructor, InjectableMeta, Injector, InjectorError, Provider, Scope, Subject,
};
use rstest::rstest;

fn test_injector(name: &str) -> Injector {
    common::try_init_test_logging();
    Injector::with_config(InjectorConfig::for_tests(name))
}

#[derive(Debug, PartialEq)]
struct Leaf {
    id: usize,
}

struct Consumer {
    leaf: Arc<Leaf>,
}

struct Assisted {
    leaf: Arc<Leaf>,
    first: Arc<&'static str>,
    second: Arc<&'static str>,
}

fn counting_leaf(counter: Arc<AtomicUsize>) -> Constructor {
    Constructor::new(move || {
        Arc::new(Leaf {
            id: counter.fetch_add(1, Ordering::SeqCst),
        })
    })
}

fn meta_for(scope: Scope) -> InjectableMeta {
    InjectableMeta::new().scope(scope)
}

#[test]
fn test_group_with_prototype_dependency_of_singleton_consumer_is_rejected() -> Result<()> {
    let injector = test_injector("scope-violation");
    injector
        .group("g")
        .with("A", Constructor::new(|| Arc::new(Leaf { id: 0 })))
        .with(
            "B",
            Constructor::new(|leaf: Arc<Leaf>| Arc::new(Consumer { leaf }))
                .annotate(InjectableMeta::new().singleton().param("A")),
        )
        .commit()?;

    match injector.get_instance("B") {
        Err(InjectorError::ScopeViolation {
            consumer,
            consumer_scope,
            dependency,
            dependency_scope,
        }) => {
            assert_eq!(consumer, "B");
            assert_eq!(consumer_scope, Scope::Singleton);
            assert_eq!(dependency, "A");
            assert_eq!(dependency_scope, Scope::Prototype);
        }
        other => panic!("expected scope violation, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_singleton_consumer_twice_returns_same_instance() -> Result<()> {
    let injector = test_injector("singleton");
    let counter = Arc::new(AtomicUsize::new(0));
    injector
        .group("g")
        .with("A", counting_leaf(Arc::clone(&counter)).annotate(InjectableMeta::new().singleton()))
        .with(
            "B",
            Constructor::new(|leaf: Arc<Leaf>| Arc::new(Consumer { leaf }))
                .annotate(InjectableMeta::new().singleton().param("A")),
        )
        .commit()?;

    let first = injector.resolve::<Consumer>("B")?;
    let second = injector.resolve::<Consumer>("B")?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.leaf.id, 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_prototype_consumer_gets_fresh_but_equal_instances() -> Result<()> {
    let injector = test_injector("prototype");
    injector
        .group("g")
        .with("A", Constructor::new(|| Arc::new(Leaf { id: 7 })))
        .with(
            "B",
            Constructor::new(|leaf: Arc<Leaf>| Arc::new(Consumer { leaf }))
                .annotate(InjectableMeta::new().param("A")),
        )
        .commit()?;

    let first = injector.resolve::<Consumer>("B")?;
    let second = injector.resolve::<Consumer>("B")?;

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first.leaf, &second.leaf));
    assert_eq!(first.leaf, second.leaf);
    Ok(())
}

#[test]
fn test_cycle_reports_full_stack_root_first() -> Result<()> {
    let injector = test_injector("cycle");
    injector
        .group("g")
        .with(
            "A",
            Constructor::new(|b: Arc<Leaf>| b).annotate(InjectableMeta::new().param("B")),
        )
        .with(
            "B",
            Constructor::new(|a: Arc<Leaf>| a).annotate(InjectableMeta::new().param("A")),
        )
        .commit()?;

    match injector.get_instance("A") {
        Err(InjectorError::CircularDependency { root, stack }) => {
            assert_eq!(root, "A");
            assert_eq!(stack, vec!["A", "B"]);
        }
        other => panic!("expected circular dependency, got {other:?}"),
    }

    // стек разрешения не "протекает" между вызовами
    assert!(matches!(
        injector.get_instance("B"),
        Err(InjectorError::CircularDependency { ref root, .. }) if root == "B"
    ));
    Ok(())
}

#[test]
fn test_assisted_arguments_trail_resolved_params() -> Result<()> {
    let injector = test_injector("assisted");
    injector
        .group("g")
        .with("A", Constructor::new(|| Arc::new(Leaf { id: 1 })))
        .with(
            "C",
            Constructor::new(
                |leaf: Arc<Leaf>, first: Arc<&'static str>, second: Arc<&'static str>| {
                    Arc::new(Assisted { leaf, first, second })
                },
            )
            .annotate(InjectableMeta::new().param("A").assisted(2)),
        )
        .commit()?;

    let c = injector.resolve_with::<Assisted>("C", assisted!["x", "y"])?;
    assert_eq!(c.leaf.id, 1);
    assert_eq!(*c.first, "x");
    assert_eq!(*c.second, "y");

    match injector.get_instance_with("C", assisted!["x"]) {
        Err(InjectorError::AssistedArgumentMismatch {
            name,
            expected,
            actual,
        }) => {
            assert_eq!(name, "C");
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected assisted mismatch, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_assisted_arguments_do_not_reach_parameters() -> Result<()> {
    let injector = test_injector("assisted-propagation");
    injector
        .group("g")
        .with(
            "A",
            Constructor::new(|tag: Arc<&'static str>| Arc::new(Leaf { id: tag.len() }))
                .annotate(InjectableMeta::new().assisted(1)),
        )
        .with(
            "B",
            Constructor::new(|leaf: Arc<Leaf>, _tag: Arc<&'static str>| Arc::new(Consumer { leaf }))
                .annotate(InjectableMeta::new().param("A").assisted(1)),
        )
        .commit()?;

    // A ожидает свой assisted аргумент, но получает пустой список
    assert!(matches!(
        injector.get_instance_with("B", assisted!["tag"]),
        Err(InjectorError::AssistedArgumentMismatch { ref name, expected: 1, actual: 0 }) if name == "A"
    ));
    Ok(())
}

#[test]
fn test_duplicate_name_across_groups_keeps_registry() -> Result<()> {
    let injector = test_injector("duplicates");
    injector
        .group("first")
        .with("A", Subject::value(1u8))
        .with("B", Subject::value(2u8))
        .commit()?;

    let groups_before = injector.module_group_names();
    let stats_before = injector.graph_stats();

    let err = injector
        .group("second")
        .with("C", Subject::value(3u8))
        .with("A", Subject::value(4u8))
        .commit()
        .unwrap_err();

    assert!(matches!(err, InjectorError::Registration { ref name, .. } if name == "A"));
    assert_eq!(injector.module_group_names(), groups_before);
    assert_eq!(injector.graph_stats(), stats_before);
    assert!(injector.injectable("C").is_none());
    assert_eq!(*injector.resolve::<u8>("A")?, 1);
    Ok(())
}

#[test]
fn test_not_found_lists_groups_or_container() -> Result<()> {
    let empty = test_injector("lonely");
    let message = empty.get_instance("missing").unwrap_err().to_string();
    assert!(message.contains("no module groups were found"));
    assert!(message.contains("lonely"));

    let injector = test_injector("populated");
    injector.module_group("infrastructure", [("clock", Subject::value(0u64))])?;
    injector.module_group("services", [("port", Subject::value(8080u16))])?;

    let message = injector.get_instance("missing").unwrap_err().to_string();
    assert!(message.contains("infrastructure,services"));
    Ok(())
}

#[test]
fn test_missing_parameter_is_not_found_at_resolution() -> Result<()> {
    let injector = test_injector("late-binding");
    injector.register(
        "consumer",
        Constructor::new(|leaf: Arc<Leaf>| Arc::new(Consumer { leaf }))
            .annotate(InjectableMeta::new().param("leaf")),
    )?;

    assert!(matches!(
        injector.get_instance("consumer"),
        Err(InjectorError::NotFound { ref name, .. }) if name == "leaf"
    ));
    assert!(matches!(
        injector.descendants_of("consumer"),
        Err(InjectorError::UnbackedVertex { .. })
    ));

    // параметр можно зарегистрировать позже
    injector.register("leaf", Constructor::new(|| Arc::new(Leaf { id: 3 })))?;
    assert_eq!(injector.resolve::<Consumer>("consumer")?.leaf.id, 3);
    assert_eq!(injector.descendants_of("consumer")?, vec!["leaf"]);
    Ok(())
}

#[test]
fn test_module_group_instances_in_registration_order() -> Result<()> {
    let injector = test_injector("bulk");
    injector
        .group("g")
        .with("port", Subject::value(8080u16))
        .with("host", Subject::value("localhost"))
        .with(
            "address",
            Provider::new(|host: Arc<&'static str>, port: Arc<u16>| Arc::new(format!("{host}:{port}")))
                .param("host")
                .param("port"),
        )
        .commit()?;

    let instances = injector.module_group_instances("g")?;
    let names: Vec<&str> = instances.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["port", "host", "address"]);
    assert_eq!(*instances[2].1.downcast::<String>()?, "localhost:8080");

    assert!(matches!(
        injector.module_group_instances("nope"),
        Err(InjectorError::ModuleGroupNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_construction_failure_is_wrapped_and_not_cached() -> Result<()> {
    let injector = test_injector("failure");
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    injector.register(
        "flaky",
        Constructor::new(move || -> anyhow::Result<Arc<Leaf>> {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt == 0 {
                anyhow::bail!("first attempt fails");
            }
            Ok(Arc::new(Leaf { id: attempt }))
        })
        .annotate(InjectableMeta::new().singleton()),
    )?;

    assert!(matches!(
        injector.get_instance("flaky"),
        Err(InjectorError::Construction { ref name, .. }) if name == "flaky"
    ));
    assert_eq!(injector.resolve::<Leaf>("flaky")?.id, 1);
    assert_eq!(injector.resolve::<Leaf>("flaky")?.id, 1);
    Ok(())
}

#[test]
fn test_failed_eager_singleton_keeps_group_registered() -> Result<()> {
    common::try_init_test_logging();
    let injector = Injector::with_config(InjectorConfig {
        eager_instantiation: true,
        ..InjectorConfig::for_tests("eager")
    });
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let err = injector
        .group("startup")
        .with(
            "connection",
            Constructor::new(move || -> anyhow::Result<Arc<Leaf>> {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt == 0 {
                    anyhow::bail!("server not ready");
                }
                Ok(Arc::new(Leaf { id: attempt }))
            })
            .annotate(InjectableMeta::new().singleton().eager()),
        )
        .commit()
        .unwrap_err();

    match &err {
        InjectorError::EagerInstantiation { group, name, source } => {
            assert_eq!(group, "startup");
            assert_eq!(name, "connection");
            assert!(matches!(**source, InjectorError::Construction { .. }));
        }
        other => panic!("expected EagerInstantiation, got {other:?}"),
    }
    assert_eq!(injector.module_group_names(), vec!["startup".to_string()]);
    assert!(injector.injectable("connection").is_some());
    assert_eq!(injector.resolve::<Leaf>("connection")?.id, 1);
    Ok(())
}

#[test]
fn test_wrong_arity_rejected_at_registration() {
    let injector = test_injector("arity");
    let err = injector
        .register(
            "two",
            Constructor::new(|a: Arc<Leaf>, b: Arc<Leaf>| Arc::new(a.id + b.id))
                .annotate(InjectableMeta::new().param("a")),
        )
        .unwrap_err();

    assert!(matches!(err, InjectorError::Registration { .. }));
    assert!(injector.module_group_names().is_empty());
}

/// Потребитель может зависеть только от injectable, живущего не меньше него
#[rstest]
#[case(Scope::Singleton, Scope::Singleton, true)]
#[case(Scope::Singleton, Scope::Prototype, false)]
#[case(Scope::Prototype, Scope::Singleton, true)]
#[case(Scope::Prototype, Scope::Prototype, true)]
#[case(Scope::Application, Scope::Prototype, false)]
fn test_scope_matrix(#[case] consumer: Scope, #[case] dependency: Scope, #[case] allowed: bool) -> Result<()> {
    let injector = test_injector("matrix");
    injector
        .group("g")
        .with("dep", Constructor::new(|| Arc::new(Leaf { id: 0 })).annotate(meta_for(dependency)))
        .with(
            "consumer",
            Constructor::new(|leaf: Arc<Leaf>| Arc::new(Consumer { leaf }))
                .annotate(meta_for(consumer).param("dep")),
        )
        .commit()?;

    let result = injector.get_instance("consumer");
    if allowed {
        assert!(result.is_ok(), "{consumer} -> {dependency}: {result:?}");
    } else if consumer == Scope::Application {
        // Application scope не реализован, ошибка возникает до scope check зависимости
        assert!(matches!(result, Err(InjectorError::NotImplemented { .. })));
    } else {
        assert!(matches!(result, Err(InjectorError::ScopeViolation { .. })));
    }
    Ok(())
}
