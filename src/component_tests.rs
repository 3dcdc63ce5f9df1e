//! Element behavior tests: construction, styling, events, reflection and
//! attribute sync, repeatable rendering.

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::component::{ElementInstance, LifecycleState};
    use crate::config::Config;
    use crate::define::{define, ComponentDefinition, PropertySpec};
    use crate::document::Document;
    use crate::dom;
    use crate::html::{event, html, TemplateValue};

    fn counter_definition() -> ComponentDefinition {
        ComponentDefinition::new()
            .template(html(
                &["<button ", ">+</button>"],
                &[event("click", "increment").into()],
            ))
            .property("count", PropertySpec::new(0).reflect())
            .method("increment", |el, _| {
                let count = el.get_property("count").as_i64().unwrap_or(0);
                el.set_property("count", count + 1);
            })
    }

    fn instance(document: &mut Document, tag: &str, definition: ComponentDefinition) -> ElementInstance {
        define(document, tag, definition).unwrap();
        document.create_element(tag).unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // END TO END
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_counter_click_reflects_count() {
        let mut document = Document::new();
        let mut counter = instance(&mut document, "x-counter", counter_definition());
        document.connect(&mut counter);

        let button = counter.get_element("button").unwrap();
        assert!(!dom::has_attribute(&button, "data-event-click"));
        assert_eq!(counter.dispatch_event(&button, "click"), 1);

        assert_eq!(counter.get_attribute("count").as_deref(), Some("1"));
        assert_eq!(counter.get_property("count"), json!(1));

        counter.dispatch_event(&button, "click");
        assert_eq!(counter.get_attribute("count").as_deref(), Some("2"));
    }

    #[test]
    fn test_lifecycle_order() {
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());

        let definition = ComponentDefinition::new()
            .template("<p>hi</p>")
            .styles("p { color: red; }")
            .on_init(move |el| {
                l1.borrow_mut().push(format!("init:{}", el.inner_html().contains("<p>hi</p>")))
            })
            .on_connected(move |_| l2.borrow_mut().push("connected".to_string()))
            .on_disconnected(move |_| l3.borrow_mut().push("disconnected".to_string()));

        let mut document = Document::new();
        let mut element = instance(&mut document, "x-life", definition);
        assert_eq!(element.state(), LifecycleState::Initialized);

        document.connect(&mut element);
        assert_eq!(element.state(), LifecycleState::Connected);
        document.disconnect(&mut element);
        document.connect(&mut element);

        assert_eq!(
            *log.borrow(),
            vec!["init:true", "connected", "disconnected", "connected"]
        );
    }

    #[test]
    fn test_hook_named_methods_run_as_hooks() {
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let (l1, l2) = (log.clone(), log.clone());
        let definition = ComponentDefinition::new()
            .method("init", move |_, _| l1.borrow_mut().push("init".to_string()))
            .method("connected", move |_, _| l2.borrow_mut().push("connected".to_string()));

        let mut document = Document::new();
        let mut element = instance(&mut document, "x-hooks", definition);
        document.connect(&mut element);
        assert_eq!(*log.borrow(), vec!["init", "connected"]);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // STYLES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_light_dom_styles_are_scoped_per_instance() {
        let mut document = Document::new();
        define(
            &mut document,
            "my-card",
            ComponentDefinition::new()
                .template("<h2 class=\"title\">t</h2>")
                .styles(".title { color: red; }"),
        )
        .unwrap();
        let a = document.create_element("my-card").unwrap();
        let b = document.create_element("my-card").unwrap();

        let attr_a = a.scope_attribute().unwrap().to_string();
        let attr_b = b.scope_attribute().unwrap().to_string();
        assert!(attr_a.starts_with("data-my-card-"));
        assert_eq!(attr_a.len(), "data-my-card-".len() + 6);
        assert_ne!(attr_a, attr_b);
        assert_eq!(dom::get_attribute(a.host(), &attr_a).as_deref(), Some(""));

        let styles = document.head_styles();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0], format!("[{}] .title {{ color: red; }}", attr_a));
    }

    #[test]
    fn test_cached_styles_share_parsed_blocks() {
        let mut document = Document::with_config(Config {
            style_cache: true,
            ..Config::default()
        })
        .unwrap();
        define(&mut document, "x-tag", ComponentDefinition::new().styles("b { x: y }")).unwrap();
        let _a = document.create_element("x-tag").unwrap();
        let _b = document.create_element("x-tag").unwrap();
        assert_eq!(document.style_cache().len(), 1);
        assert_eq!(document.style_cache().live_count("x-tag", "b { x: y }"), 2);
        assert_eq!(document.head_styles().len(), 2);
    }

    #[test]
    fn test_shadow_styles_survive_rerender() {
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-shadow",
            ComponentDefinition::new()
                .use_shadow(true)
                .styles(".a { color: red; }")
                .render(|el| format!("<p class=\"a\">{}</p>", el.get_property("label").as_str().unwrap_or(""))),
        );
        assert!(element.scope_attribute().is_none());
        assert!(document.head_styles().is_empty());
        assert_eq!(
            element.inner_html(),
            "<style>.a { color: red; }</style><p class=\"a\"></p>"
        );

        element.update([("label", "hello")]);
        assert_eq!(
            element.inner_html(),
            "<style>.a { color: red; }</style><p class=\"a\">hello</p>"
        );
        assert!(element.host().children.borrow().is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROPERTIES & ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_reflective_boolean_and_string_properties() {
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-toggle",
            ComponentDefinition::new()
                .property("isOpen", PropertySpec::new(false).reflect())
                .property("label", PropertySpec::new("").reflect()),
        );

        element.set_property("isOpen", true);
        assert_eq!(element.get_attribute("is-open").as_deref(), Some(""));

        element.set_property("isOpen", false);
        assert_eq!(element.get_attribute("is-open"), None);

        element.set_property("label", "x");
        assert_eq!(element.get_attribute("label").as_deref(), Some("x"));

        element.set_property("label", Value::Null);
        assert_eq!(element.get_attribute("label"), None);
    }

    #[test]
    fn test_reflects_structured_values_as_json() {
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-data",
            ComponentDefinition::new().property("items", PropertySpec::new(json!([])).reflect()),
        );
        element.set_property("items", json!([1, 2]));
        assert_eq!(element.get_attribute("items").as_deref(), Some("[1,2]"));
        assert_eq!(element.get_property("items"), json!([1, 2]));
    }

    #[test]
    fn test_attribute_changes_sync_into_properties() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-sync",
            ComponentDefinition::new()
                .observe("max-count")
                .on_attribute_changed(move |_, name, old, new| {
                    sink.borrow_mut()
                        .push((name.to_string(), old.map(String::from), new.map(String::from)))
                }),
        );

        element.set_attribute("max-count", "5");
        element.set_attribute("max-count", "6");
        assert_eq!(element.get_property("maxCount"), json!(6));

        element.set_attribute("max-count", "abc");
        assert_eq!(element.get_property("maxCount"), json!("abc"));

        element.set_attribute("max-count", "abc");
        element.set_attribute("unobserved", "1");
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(
            seen.borrow()[1],
            ("max-count".to_string(), Some("5".to_string()), Some("6".to_string()))
        );

        element.remove_attribute("max-count");
        assert_eq!(element.get_property("maxCount"), Value::Null);
    }

    #[test]
    fn test_observer_and_property_changed_hooks() {
        let calls = Rc::new(RefCell::new(Vec::<Value>::new()));
        let (observer_log, changed_log) = (calls.clone(), calls.clone());
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-watch",
            ComponentDefinition::new()
                .property("title", PropertySpec::new("a").observer("onTitle"))
                .method("onTitle", move |_, args| {
                    observer_log.borrow_mut().push(json!(["observer", args]))
                })
                .on_property_changed(move |_, name, old, new| {
                    changed_log.borrow_mut().push(json!(["changed", name, old, new]))
                }),
        );

        assert_eq!(element.get_property("title"), json!("a"));
        element.set_property("title", "b");
        element.set_property("title", "b");

        let calls = calls.borrow();
        assert_eq!(calls[0], json!(["observer", ["b", null, "title"]]));
        assert_eq!(calls[1], json!(["changed", "title", null, "b"]));
        assert_eq!(calls[2], json!(["observer", ["b", "b", "title"]]));
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn test_undeclared_properties_are_plain_state() {
        let mut document = Document::new();
        let mut element = instance(&mut document, "x-plain", ComponentDefinition::new());
        element.set_property("anything", 3);
        assert_eq!(element.get_property("anything"), json!(3));
        assert_eq!(element.get_attribute("anything"), None);
        assert_eq!(element.get_property("missing"), Value::Null);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unknown_handler_is_skipped() {
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-missing-handler",
            ComponentDefinition::new()
                .template("<button data-event-click=\"nope\">x</button><a data-event-click=\"go\">y</a>")
                .method("go", |_, _| {}),
        );
        assert_eq!(element.listener_count(), 1);
        let button = element.get_element("button").unwrap();
        assert!(!dom::has_attribute(&button, "data-event-click"));
        assert_eq!(element.dispatch_event(&button, "click"), 0);
    }

    #[test]
    fn test_events_bubble_to_bound_ancestors() {
        let payloads = Rc::new(RefCell::new(Vec::new()));
        let sink = payloads.clone();
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-bubble",
            ComponentDefinition::new()
                .template("<div data-event-click=\"hit\"><span>inner</span></div>")
                .method("hit", move |_, args| sink.borrow_mut().push(args[0].clone())),
        );
        let span = element.get_element("span").unwrap();
        assert_eq!(element.dispatch_event(&span, "click"), 1);
        assert_eq!(element.dispatch_event(&span, "input"), 0);
        assert_eq!(payloads.borrow()[0], json!({"type": "click"}));
    }

    #[test]
    fn test_markers_bind_under_any_loaded_config() {
        let config = Config::from_toml_str(r#"event_prefix = "data-on-""#).unwrap();
        let mut document = Document::with_config(config).unwrap();
        let mut counter = instance(&mut document, "x-prefixed", counter_definition());

        assert_eq!(counter.listener_count(), 1);
        assert!(!counter.inner_html().contains("data-"));
        let button = counter.get_element("button").unwrap();
        assert_eq!(counter.dispatch_event(&button, "click"), 1);
        assert_eq!(counter.get_property("count"), json!(1));
    }

    #[test]
    fn test_update_rebinds_listeners() {
        let mut document = Document::new();
        let mut counter = instance(&mut document, "x-rebind", counter_definition());
        let old_button = counter.get_element("button").unwrap();

        counter.update(Vec::<(String, Value)>::new());
        assert_eq!(counter.listener_count(), 1);
        assert_eq!(counter.dispatch_event(&old_button, "click"), 0);

        let button = counter.get_element("button").unwrap();
        assert_eq!(counter.dispatch_event(&button, "click"), 1);
    }

    #[test]
    fn test_call_method() {
        let mut document = Document::new();
        let mut counter = instance(&mut document, "x-call", counter_definition());
        assert!(counter.call_method("increment", &[]));
        assert!(!counter.call_method("decrement", &[]));
        assert_eq!(counter.get_attribute("count").as_deref(), Some("1"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_light_dom_queries_see_host_ancestors() {
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-q",
            ComponentDefinition::new().template("<button>b</button>"),
        );
        assert!(element.get_element("x-q button").is_some());
        assert!(element.get_element("body button").is_none());

        document.connect(&mut element);
        assert!(element.get_element("x-q button").is_some());
        assert!(element.get_element("body > x-q > button").is_some());
        assert!(element.get_element("x-q").is_none());
    }

    #[test]
    fn test_shadow_queries_stop_at_shadow_root() {
        let mut document = Document::new();
        let mut element = instance(
            &mut document,
            "x-sq",
            ComponentDefinition::new().use_shadow(true).template("<button>b</button>"),
        );
        document.connect(&mut element);
        assert!(element.get_element("button").is_some());
        assert!(element.get_element("x-sq button").is_none());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // REPEATABLE RENDERING
    // ═══════════════════════════════════════════════════════════════════════════════

    fn list_element(document: &mut Document) -> ElementInstance {
        instance(
            document,
            "x-list",
            ComponentDefinition::new().template(
                "<ul class=\"items\">\
                   <li data-repeatable-ref=\"item\"><span class=\"name\"></span></li>\
                   <li>stale</li><li>stale</li>\
                 </ul>",
            ),
        )
    }

    #[test]
    fn test_render_repeatable_elements() {
        let mut document = Document::new();
        let mut element = list_element(&mut document);
        let items = vec![json!({"name": "a"}), json!({"name": "b"}), json!({"name": "c"})];

        let rendered = element.render_repeatable_elements(".items", "item", &items, |node, item| {
            let name = crate::selector::query_selector(node, ".name").unwrap();
            dom::set_text_content(&name, item["name"].as_str().unwrap());
        });

        assert_eq!(rendered.len(), 3);
        let list = element.get_element(".items").unwrap();
        let children = dom::element_children(&list);
        assert_eq!(children.len(), 3);
        for (child, expected) in children.iter().zip(["a", "b", "c"]) {
            assert!(!dom::has_attribute(child, "data-repeatable-ref"));
            assert_eq!(dom::text_content(child), expected);
        }
        assert!(Rc::ptr_eq(&children[0], &rendered[0]));
    }

    #[test]
    fn test_render_repeatable_missing_container_is_noop() {
        let mut document = Document::new();
        let mut element = list_element(&mut document);
        let before = element.inner_html();

        let rendered = element.render_repeatable_elements(".nope", "item", &[1, 2, 3], |_, _| {});
        assert!(rendered.is_empty());
        let rendered = element.render_repeatable_elements(".items", "other", &[1], |_, _| {});
        assert!(rendered.is_empty());
        assert_eq!(element.inner_html(), before);
    }

    #[test]
    fn test_template_values_render_into_markup() {
        let markup = html(
            &["<p title=\"", "\">", "</p>"],
            &[TemplateValue::from("a\"b"), TemplateValue::from(Option::<String>::None)],
        );
        let mut document = Document::new();
        let element = instance(&mut document, "x-escaped", ComponentDefinition::new().template(markup));
        assert_eq!(element.inner_html(), "<p title=\"a&quot;b\"></p>");
    }
}
