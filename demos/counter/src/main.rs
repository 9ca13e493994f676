//! Click-counter demo: four simulated clicks through a boxed callback.
//!
//! The parent re-renders after every click, yet the memoized child that
//! receives the callback renders exactly once, because the boxed callback's
//! identity never changes.

use boxcall::{
    create_instance, dispatch_event, register_handler, render_instance, take_dirty,
    use_boxed_callback, use_memo_child, use_ref, use_state, BoxedCallback, EventHandlerId,
};
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let clicks_view = Rc::new(Cell::new(0));
    let child_renders_view = Rc::new(Cell::new(0));
    let button = Rc::new(Cell::new(None::<EventHandlerId>));

    let app = create_instance();
    let render_app = {
        let clicks_view = Rc::clone(&clicks_view);
        let child_renders_view = Rc::clone(&child_renders_view);
        let button = Rc::clone(&button);
        move || {
            let (clicks, set_clicks) = use_state(|| 0);
            clicks_view.set(clicks);

            let on_click: BoxedCallback<(), i32> = use_boxed_callback(
                {
                    let set_clicks = set_clicks.clone();
                    move |_event: (), current: i32| set_clicks.set(current + 1)
                },
                clicks,
            );

            let child_renders_view = Rc::clone(&child_renders_view);
            let button = Rc::clone(&button);
            use_memo_child(on_click, move |on_click| {
                let renders = use_ref(|| 0);
                *renders.borrow_mut() += 1;
                child_renders_view.set(*renders.borrow());

                let slot = use_ref(|| None::<EventHandlerId>);
                if slot.borrow().is_none() {
                    let on_click = on_click.clone();
                    let id = register_handler(Box::new(move || on_click.call(())));
                    slot.set(Some(id));
                    button.set(Some(id));
                }
            });
        }
    };

    render_instance(app, &render_app).expect("initial render");
    let button = button.get().expect("child wired its button on mount");

    for click in 1..=4 {
        dispatch_event(button);
        for id in take_dirty() {
            render_instance(id, &render_app).expect("re-render after click");
        }
        info!(click, clicks = clicks_view.get(), "click handled");
    }

    println!("Clicks: {}", clicks_view.get());
    println!("Child renders: {}", child_renders_view.get());
}
