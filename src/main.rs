//! Beam Maze entry point
//!
//! The browser build wires DOM keyboard events and `requestAnimationFrame` to
//! the simulation. The native build runs a short scripted demo headless.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use beam_maze::GameConfig;
    use beam_maze::assets::AssetLibrary;
    use beam_maze::input::{CameraView, Key, KeyboardState};
    use beam_maze::sim::{FRAME_DT, GameEvent, GamePhase, GameState, TickInput, tick};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        keyboard: KeyboardState,
        camera: CameraView,
        last_time: f64,
        last_phase: GamePhase,
    }

    impl Game {
        fn new(state: GameState) -> Self {
            Self {
                last_phase: state.phase,
                state,
                keyboard: KeyboardState::new(),
                camera: CameraView::default(),
                last_time: 0.0,
            }
        }

        fn update(&mut self, dt: f32) {
            let input = TickInput::from_provider(&mut self.keyboard, self.camera);
            tick(&mut self.state, &input, dt.min(0.1));

            for event in self.state.drain_events() {
                match event {
                    GameEvent::PoweredUp { level } => log::info!("Power level {}", level),
                    GameEvent::StageCleared => log::info!("Stage cleared"),
                    other => log::debug!("{:?}", other),
                }
            }

            if self.state.phase != self.last_phase {
                let message = match self.state.phase {
                    GamePhase::Paused => Some("Paused"),
                    GamePhase::Cleared => Some("Stage cleared!"),
                    GamePhase::Playing => None,
                };
                set_status(message);
                self.last_phase = self.state.phase;
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let fields = [
                ("#hud-score .hud-value", self.state.scoring.score().to_string()),
                ("#hud-level .hud-value", self.state.scoring.level().to_string()),
                (
                    "#hud-enemies .hud-value",
                    self.state.enemies.alive_count().to_string(),
                ),
            ];
            for (selector, value) in fields {
                if let Some(el) = document.query_selector(selector).ok().flatten() {
                    el.set_text_content(Some(&value));
                }
            }
        }
    }

    /// Show (or hide with `None`) the status message
    fn set_status(message: Option<&str>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id("status") {
            el.set_text_content(message);
            let _ = el.set_attribute("class", if message.is_some() { "" } else { "hidden" });
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Beam Maze starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let state = match GameState::new(GameConfig::load(), &AssetLibrary::builtin()) {
            Ok(state) => state,
            Err(e) => {
                log::error!("Startup failed: {}", e);
                set_status(Some(&format!("Failed to start: {e}")));
                return;
            }
        };
        let game = Rc::new(RefCell::new(Game::new(state)));

        setup_input_handlers(game.clone());

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        request_animation_frame(game);

        log::info!("Beam Maze running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                if let Some(key) = Key::from_code(&event.code()) {
                    event.prevent_default();
                    game.borrow_mut().keyboard.key_down(key);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                if let Some(key) = Key::from_code(&event.code()) {
                    game.borrow_mut().keyboard.key_up(key);
                }
            });
            let _ =
                window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur: drop held keys so nothing sticks
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().keyboard.clear();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                FRAME_DT
            };
            g.last_time = time;

            g.update(dt);
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use beam_maze::GameConfig;
    use beam_maze::assets::AssetLibrary;
    use beam_maze::sim::{FRAME_DT, GameEvent, GameState, TickInput, tick};

    env_logger::init();
    log::info!("Beam Maze (native) starting...");
    log::info!("Native mode runs a headless demo - build for wasm32 to play");

    let mut state = match GameState::new(GameConfig::load(), &AssetLibrary::builtin()) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Twenty seconds: walk a little, then kick every second while turning
    let mut kills = 0;
    for frame in 0..1200u32 {
        let second = frame / 60;
        let input = TickInput {
            forward: second < 2,
            left: (4..6).contains(&second),
            right: (10..12).contains(&second),
            kick: frame % 60 == 0,
            ..Default::default()
        };
        tick(&mut state, &input, FRAME_DT);
        for event in state.drain_events() {
            if let GameEvent::EnemyKilled { enemy, kind } = event {
                log::info!("Killed {} #{}", kind.tag(), enemy);
                kills += 1;
            }
        }
    }

    log::info!(
        "Demo finished: score {}, level {}, {} kills, {} enemies left",
        state.scoring.score(),
        state.scoring.level(),
        kills,
        state.enemies.alive_count()
    );
    state.shutdown();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
