use falcon_core::prelude::*;
use tracing_subscriber::EnvFilter;

store! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Settings {
        theme: String,
    }
    pub struct SettingsStore;
    pub struct SettingsPatch;
}

fn home_page(rt: &Runtime) -> Child {
    let (count, set_count) = rt.create_signal(0);
    let doubled = rt.create_memo(move || count.get() * 2);

    Child::from(vec![
        Child::from(element(rt, "h2", Props::new(), vec!["Welcome to your new Falcon app!".into()])),
        Child::from(element(
            rt,
            "p",
            Props::new(),
            vec![Child::reactive(move || format!("Doubled: {}", doubled.get()))],
        )),
        Child::from(element(
            rt,
            "button",
            Props::new().on("onClick", move |_| set_count.update(|n| n + 1)),
            vec!["Increment".into()],
        )),
    ])
}

fn app(rt: &Runtime, router: &Router, settings: &SettingsStore) -> Child {
    let theme = settings.clone();
    let home = {
        let handle = rt.downgrade();
        Child::lazy(move || handle.upgrade().map(|rt| home_page(&rt)).unwrap_or_default())
    };

    create_element(
        rt,
        "div",
        Props::new()
            .attr("id", "app-container")
            .bind("class", move || theme.theme()),
        vec![
            Child::from(element(
                rt,
                "header",
                Props::new(),
                vec![
                    Child::from(element(rt, "h1", Props::new(), vec!["Falcon".into()])),
                    Child::from(element(rt, "nav", Props::new(), vec![Child::from(router.link(rt, "/", "Home"))])),
                ],
            )),
            Child::from(element(rt, "main", Props::new(), vec![Child::from(router.route(rt, "/", home))])),
        ],
    )
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();

    let runtime = Runtime::new();
    let router = Router::new(&runtime, MemoryHistory::default());
    let settings = SettingsStore::new(&runtime, Settings { theme: "light".to_string() });

    let root = Node::element("div");
    {
        let router = router.clone();
        let settings = settings.clone();
        render(&runtime, move |rt| app(rt, &router, &settings), &root);
    }
    println!("{}", root.inner_html());

    for button in root.find_all("button") {
        button.dispatch_event(&Event::new("click"));
    }
    settings.set(SettingsPatch { theme: Some("dark".to_string()) });
    println!("{}", root.inner_html());
}
