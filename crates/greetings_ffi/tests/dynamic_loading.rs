mod common;

use anyhow::Result;
use greetings_ffi::{Greetings, GreetingsError, LoaderConfig, Person, configure};

#[test]
fn loads_the_built_library_by_path() -> Result<()> {
    let Some(path) = common::built_library() else {
        eprintln!("Skipping dynamic loading test: greetings_native cdylib not built next to the tests");
        return Ok(());
    };

    let greetings = Greetings::load(&LoaderConfig::new().with_library_path(&path))?;
    assert_eq!(greetings.library_path(), Some(path.as_path()));
    assert_eq!(greetings.render_greeting("World")?, "Hello, World!");
    assert_eq!(
        greetings.greet(&Person::new("John", "Smith"))?,
        "Hello, John Smith!"
    );
    assert_eq!(greetings.greeting_by_value()?.text(), "Hello from Rust!");

    let set = greetings.render_greetings()?;
    assert_eq!(set.texts()?, ["Hello!", "Hello again!"]);
    set.release();

    let mut received = Vec::new();
    greetings.call_me_back(|text| {
        received.push(text.to_owned());
        Ok::<_, GreetingsError>(())
    })?;
    assert_eq!(received, ["Hello there!"]);

    assert!(greetings.metrics().is_balanced());
    Ok(())
}

#[test]
fn loads_the_built_library_from_a_search_dir() -> Result<()> {
    let Some(path) = common::built_library() else {
        eprintln!("Skipping dynamic loading test: greetings_native cdylib not built next to the tests");
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };

    let greetings = Greetings::load(&LoaderConfig::new().with_search_dir(dir))?;
    assert_eq!(greetings.render_greeting("search")?, "Hello, search!");
    Ok(())
}

#[test]
fn global_instance_uses_the_installed_config() -> Result<()> {
    let Some(path) = common::built_library() else {
        eprintln!("Skipping dynamic loading test: greetings_native cdylib not built next to the tests");
        return Ok(());
    };

    configure(LoaderConfig::new().with_library_path(&path))?;
    let greetings = Greetings::global()?;
    assert_eq!(greetings.render_greeting("global")?, "Hello, global!");
    assert!(std::ptr::eq(greetings, Greetings::global()?));

    let err = configure(LoaderConfig::new()).unwrap_err();
    assert!(matches!(err, GreetingsError::AlreadyConfigured));
    Ok(())
}

#[test]
fn unknown_library_name_lists_every_candidate() {
    let config = LoaderConfig::new().with_library_name("no_such_greetings_library");
    let err = Greetings::load(&config).unwrap_err();
    match err {
        GreetingsError::LibraryNotFound { name, tried } => {
            assert_eq!(name, "no_such_greetings_library");
            assert!(!tried.is_empty());
        }
        other => panic!("expected LibraryNotFound, got {other:?}"),
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
const SYSTEM_LIBRARY: &str = "libc.so.6";
#[cfg(target_os = "macos")]
const SYSTEM_LIBRARY: &str = "/usr/lib/libSystem.B.dylib";
#[cfg(windows)]
const SYSTEM_LIBRARY: &str = "kernel32.dll";

#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos", windows))]
#[test]
fn library_without_the_entry_points_fails_to_load() {
    let config = LoaderConfig::new().with_library_path(SYSTEM_LIBRARY);
    let err = Greetings::load(&config).unwrap_err();
    match err {
        GreetingsError::MissingEntryPoint { symbol, path, .. } => {
            assert_eq!(symbol, "print_greeting");
            assert_eq!(path, std::path::Path::new(SYSTEM_LIBRARY));
        }
        other => panic!("expected MissingEntryPoint, got {other:?}"),
    }
}
