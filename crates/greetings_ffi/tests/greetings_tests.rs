mod common;

use std::mem::{align_of, offset_of, size_of};
use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::{Result, anyhow};
use greetings_ffi::records::{RawGreeting, RawGreetingSet, RawPerson};
use greetings_ffi::{GreetingsError, Person, ReleaseSnapshot};

#[test]
fn record_layouts_agree_with_the_native_side() {
    use greetings_native::{Greeting, GreetingSet, Person};

    assert_eq!(size_of::<RawPerson>(), size_of::<Person>());
    assert_eq!(offset_of!(RawPerson, first_name), offset_of!(Person, first_name));
    assert_eq!(offset_of!(RawPerson, last_name), offset_of!(Person, last_name));

    assert_eq!(size_of::<RawGreeting>(), size_of::<Greeting>());
    assert_eq!(offset_of!(RawGreeting, text), offset_of!(Greeting, text));

    assert_eq!(size_of::<RawGreetingSet>(), size_of::<GreetingSet>());
    assert_eq!(align_of::<RawGreetingSet>(), align_of::<GreetingSet>());
    assert_eq!(
        offset_of!(RawGreetingSet, greetings),
        offset_of!(GreetingSet, greetings)
    );
    assert_eq!(
        offset_of!(RawGreetingSet, count),
        offset_of!(GreetingSet, number_of_greetings)
    );
}

#[test]
fn render_greeting_says_hello() -> Result<()> {
    let greetings = common::linked();
    assert_eq!(greetings.render_greeting("World")?, "Hello, World!");
    assert!(greetings.metrics().is_balanced());
    Ok(())
}

#[test]
fn text_echoes_back_byte_for_byte() -> Result<()> {
    let greetings = common::linked();
    for name in ["", "World", "Grüße", "世界", "emoji 🦀", "  spaced  ", "a\tb\nc"] {
        assert_eq!(greetings.render_greeting(name)?, format!("Hello, {name}!"));
    }
    Ok(())
}

#[test]
fn embedded_nul_is_rejected_before_the_call() {
    let greetings = common::linked();
    let err = greetings.render_greeting("Wor\0ld").unwrap_err();
    assert!(matches!(err, GreetingsError::InteriorNul { position: 3 }));

    let err = greetings.greet(&Person::new("John", "Sm\0ith")).unwrap_err();
    assert!(matches!(err, GreetingsError::InteriorNul { position: 2 }));
    assert_eq!(greetings.metrics(), ReleaseSnapshot::default());
}

#[test]
fn greet_uses_first_and_last_name() -> Result<()> {
    let greetings = common::linked();
    let john = Person::new("John", "Smith");
    assert_eq!(greetings.greet(&john)?, "Hello, John Smith!");
    Ok(())
}

#[test]
fn print_greeting_accepts_a_name() -> Result<()> {
    let greetings = common::linked();
    greetings.print_greeting("World")?;
    Ok(())
}

#[test]
fn greeting_by_value_needs_no_release() -> Result<()> {
    let greetings = common::linked();
    let greeting = greetings.greeting_by_value()?;
    assert_eq!(greeting.text(), "Hello from Rust!");
    assert_eq!(greetings.metrics(), ReleaseSnapshot::default());
    Ok(())
}

#[test]
fn greeting_by_reference_is_released_once() -> Result<()> {
    let greetings = common::linked();
    let greeting = greetings.greeting_by_reference()?;
    assert_eq!(greeting.text()?, "Hello from Rust!");
    assert_eq!(greetings.metrics().outstanding(), 1);

    greeting.release();
    let metrics = greetings.metrics();
    assert_eq!(metrics.greetings_acquired, 1);
    assert_eq!(metrics.greetings_released, 1);
    assert!(metrics.is_balanced());
    Ok(())
}

#[test]
fn render_greetings_yields_two_greetings_in_order() -> Result<()> {
    let greetings = common::linked();
    let set = greetings.render_greetings()?;
    assert_eq!(set.len()?, 2);
    let texts = set.texts()?;
    set.release();

    assert_eq!(texts, ["Hello!", "Hello again!"]);
    let metrics = greetings.metrics();
    assert_eq!((metrics.sets_acquired, metrics.sets_released), (1, 1));
    Ok(())
}

#[test]
fn set_iteration_is_bounded_by_count() -> Result<()> {
    let greetings = common::linked();
    let set = greetings.render_greetings()?;
    let view = set.view();
    assert_eq!(view.count(), 2);
    assert_eq!(view.greetings()?.len(), view.len()?);
    Ok(())
}

#[test]
fn parallel_greetings_are_numbered_in_order() -> Result<()> {
    let greetings = common::linked();
    let set = greetings.render_greetings_in_parallel(6, "World")?;
    let texts = set.texts()?;
    set.release();

    let expected: Vec<String> = (1..=6)
        .map(|number| format!("Greeting number {number} for World"))
        .collect();
    assert_eq!(texts, expected);
    assert!(greetings.metrics().is_balanced());
    Ok(())
}

#[test]
fn zero_parallel_greetings_is_an_empty_set() -> Result<()> {
    let greetings = common::linked();
    let set = greetings.render_greetings_in_parallel(0, "World")?;
    assert!(set.is_empty()?);
    assert!(set.greetings()?.is_empty());
    Ok(())
}

#[test]
fn dropped_handles_are_released() -> Result<()> {
    let greetings = common::linked();
    {
        let _greeting = greetings.greeting_by_reference()?;
        let _set = greetings.render_greetings()?;
    }
    let metrics = greetings.metrics();
    assert_eq!(metrics.greetings_released, 1);
    assert_eq!(metrics.sets_released, 1);
    assert!(metrics.is_balanced());
    Ok(())
}

#[test]
fn scoped_access_releases_on_panic() {
    let greetings = common::linked();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        greetings.with_greeting_set(|set| -> usize {
            assert_eq!(set.len().unwrap(), 2);
            panic!("reader failed");
        })
    }));
    assert!(outcome.is_err());
    let metrics = greetings.metrics();
    assert_eq!((metrics.sets_acquired, metrics.sets_released), (1, 1));
}

#[test]
fn scoped_access_returns_the_extracted_value() -> Result<()> {
    let greetings = common::linked();
    let text = greetings.with_greeting_by_reference(|greeting| greeting.text())??;
    assert_eq!(text, "Hello from Rust!");
    let texts = greetings.with_greeting_set(|set| set.texts())??;
    assert_eq!(texts, ["Hello!", "Hello again!"]);
    assert!(greetings.metrics().is_balanced());
    Ok(())
}

#[test]
fn call_me_back_delivers_one_greeting() -> Result<()> {
    let greetings = common::linked();
    let mut received = Vec::new();
    greetings.call_me_back(|text| {
        received.push(text.to_owned());
        Ok::<_, GreetingsError>(())
    })?;
    assert_eq!(received, ["Hello there!"]);
    Ok(())
}

#[test]
fn callback_error_surfaces_after_the_native_call() {
    let greetings = common::linked();
    let err = greetings
        .call_me_back(|text| Err(anyhow!("rejected {text}")))
        .unwrap_err();
    match err {
        GreetingsError::Callback { source } => {
            assert_eq!(source.to_string(), "rejected Hello there!")
        }
        other => panic!("expected Callback, got {other:?}"),
    }
}

#[test]
fn callback_panic_does_not_cross_into_native_code() {
    let greetings = common::linked();
    let err = greetings
        .call_me_back(|_| -> Result<(), GreetingsError> { panic!("callback exploded") })
        .unwrap_err();
    assert!(matches!(
        err,
        GreetingsError::CallbackPanicked { ref message } if message == "callback exploded"
    ));
    // The library is still usable afterwards.
    assert_eq!(greetings.render_greeting("again").unwrap(), "Hello, again!");
}

#[test]
fn send_greetings_view_is_read_during_the_callback() -> Result<()> {
    let greetings = common::linked();
    let mut copied = Vec::new();
    let mut invocations = 0;
    greetings.send_greetings(|set| {
        invocations += 1;
        assert_eq!(set.len()?, 2);
        copied.extend(set.texts()?);
        Ok::<_, GreetingsError>(())
    })?;
    assert_eq!(invocations, 1);
    assert_eq!(copied, ["Hello!", "Hello again!"]);
    // The library owned and freed that set; nothing was acquired here.
    assert_eq!(greetings.metrics(), ReleaseSnapshot::default());
    Ok(())
}

#[test]
fn send_greetings_error_surfaces_after_the_library_freed_the_set() {
    let greetings = common::linked();
    let mut invocations = 0;
    let err = greetings
        .send_greetings(|set| {
            invocations += 1;
            Err(anyhow!("rejected {} greetings", set.count()))
        })
        .unwrap_err();
    assert_eq!(invocations, 1);
    match err {
        GreetingsError::Callback { source } => {
            assert_eq!(source.to_string(), "rejected 2 greetings")
        }
        other => panic!("expected Callback, got {other:?}"),
    }
    assert_eq!(greetings.metrics(), ReleaseSnapshot::default());
}

#[test]
fn repeated_calls_keep_release_discipline() -> Result<()> {
    let greetings = common::linked();
    for round in 0..200 {
        let name = format!("round {round}");
        assert_eq!(greetings.render_greeting(&name)?, format!("Hello, {name}!"));
        greetings.greeting_by_reference()?.release();
        greetings.render_greetings()?.release();
        greetings.render_greetings_in_parallel(3, &name)?.release();
        greetings.call_me_back(|_| Ok::<_, GreetingsError>(()))?;
    }
    let metrics = greetings.metrics();
    assert_eq!(metrics.greetings_acquired, 200);
    assert_eq!(metrics.sets_acquired, 400);
    assert_eq!(metrics.texts_acquired, 200);
    assert!(metrics.is_balanced());
    Ok(())
}

#[test]
fn bindings_can_be_shared_across_threads() -> Result<()> {
    let greetings = common::linked();
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let greetings = &greetings;
                scope.spawn(move || -> greetings_ffi::Result<()> {
                    let name = format!("worker {worker}");
                    assert_eq!(greetings.render_greeting(&name)?, format!("Hello, {name}!"));
                    let set = greetings.render_greetings_in_parallel(4, &name)?;
                    assert_eq!(set.len()?, 4);
                    set.release();
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker.join().map_err(|_| anyhow!("worker panicked"))??;
        }
        Ok::<_, anyhow::Error>(())
    })?;
    assert!(greetings.metrics().is_balanced());
    Ok(())
}
