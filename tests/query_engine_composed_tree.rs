use shadow_query::{Dom, Error, NodeId, QueryEngine, StructuralMatcher, TreeView};

fn engine(dom: &Dom) -> QueryEngine<'_, Dom, StructuralMatcher> {
    QueryEngine::new(dom, &StructuralMatcher)
}

/// document > html > body > div.container > (h1#title, p.text.intro, p.text)
struct LightFixture {
    dom: Dom,
    body: NodeId,
    container: NodeId,
    heading: NodeId,
    intro: NodeId,
    outro: NodeId,
}

fn light_fixture() -> LightFixture {
    let mut dom = Dom::new();
    let html = dom.create_element(dom.document(), "html");
    let body = dom.create_element(html, "body");
    let container = dom.create_element(body, "div");
    dom.set_attr(container, "class", "container").unwrap();
    let heading = dom.create_element(container, "h1");
    dom.set_attr(heading, "id", "title").unwrap();
    let intro = dom.create_element(container, "p");
    dom.set_attr(intro, "class", "text intro").unwrap();
    dom.set_attr(intro, "name", "description").unwrap();
    let outro = dom.create_element(container, "p");
    dom.set_attr(outro, "class", "text").unwrap();
    LightFixture {
        dom,
        body,
        container,
        heading,
        intro,
        outro,
    }
}

/// document > html > body > x-card, where x-card hosts a shadow tree
///
///   x-card                      (light children: span.title, span.meta)
///     #shadow-root
///       div.card-inner
///         slot[name=title]      (assigned: span.title)
///         slot                  (fallback child: em.fallback)
struct ShadowFixture {
    dom: Dom,
    card: NodeId,
    title: NodeId,
    meta: NodeId,
    inner: NodeId,
    named_slot: NodeId,
    default_slot: NodeId,
    fallback: NodeId,
}

fn shadow_fixture(assign_title: bool) -> ShadowFixture {
    let mut dom = Dom::new();
    let html = dom.create_element(dom.document(), "html");
    let body = dom.create_element(html, "body");
    let card = dom.create_element(body, "x-card");
    let title = dom.create_element(card, "span");
    dom.set_attr(title, "class", "title").unwrap();
    let meta = dom.create_element(card, "span");
    dom.set_attr(meta, "class", "meta").unwrap();

    let shadow = dom.attach_shadow(card).unwrap();
    let inner = dom.create_element(shadow, "div");
    dom.set_attr(inner, "class", "card-inner").unwrap();
    let named_slot = dom.create_element(inner, "slot");
    dom.set_attr(named_slot, "name", "title").unwrap();
    let default_slot = dom.create_element(inner, "slot");
    let fallback = dom.create_element(default_slot, "em");
    dom.set_attr(fallback, "class", "fallback").unwrap();

    if assign_title {
        dom.assign_slot(named_slot, &[title]).unwrap();
    }

    ShadowFixture {
        dom,
        card,
        title,
        meta,
        inner,
        named_slot,
        default_slot,
        fallback,
    }
}

#[test]
fn query_selector_all_collects_in_document_order() {
    let f = light_fixture();
    let q = engine(&f.dom);
    let text = q.query_selector_all(".text", f.dom.document()).unwrap();
    assert_eq!(text, vec![f.intro, f.outro]);
    let paragraphs = q.query_selector_all("p", f.dom.document()).unwrap();
    assert_eq!(paragraphs, vec![f.intro, f.outro]);
}

#[test]
fn query_selector_is_first_of_query_selector_all() {
    let f = light_fixture();
    let q = engine(&f.dom);
    for selector in ["p", ".text", "div p", "#title", ".missing", "h1, p"] {
        let all = q.query_selector_all(selector, f.dom.document()).unwrap();
        let first = q.query_selector(selector, f.dom.document()).unwrap();
        assert_eq!(first, all.first().copied(), "selector {selector:?}");
    }
}

#[test]
fn comma_alternatives_have_or_semantics() {
    let f = light_fixture();
    let q = engine(&f.dom);
    let hits = q
        .query_selector_all("h1, .intro, .missing", f.dom.document())
        .unwrap();
    assert_eq!(hits, vec![f.heading, f.intro]);
}

#[test]
fn context_is_never_part_of_the_results() {
    let f = light_fixture();
    let q = engine(&f.dom);
    let hits = q.query_selector_all("div", f.container).unwrap();
    assert!(hits.is_empty());
    let hits = q.query_selector_all("p", f.container).unwrap();
    assert_eq!(hits, vec![f.intro, f.outro]);
}

#[test]
fn repeated_queries_yield_identical_snapshots() {
    let f = light_fixture();
    let q = engine(&f.dom);
    let first = q.query_selector_all(".text", f.dom.document()).unwrap();
    let second = q.query_selector_all(".text", f.dom.document()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn invalid_selector_text_is_rejected_before_traversal() {
    let f = light_fixture();
    let q = engine(&f.dom);
    for bad in ["", "div >", "a,,b", "[open"] {
        match q.query_selector_all(bad, f.dom.document()) {
            Err(Error::InvalidSelector(_)) => {}
            other => panic!("{bad:?} should be an invalid selector, got {other:?}"),
        }
    }
}

#[test]
fn queries_pierce_the_shadow_boundary() {
    let f = shadow_fixture(true);
    let q = engine(&f.dom);
    assert_eq!(
        q.query_selector(".card-inner", f.dom.document()).unwrap(),
        Some(f.inner)
    );
    assert_eq!(
        q.query_selector_all("slot", f.dom.document()).unwrap(),
        vec![f.named_slot, f.default_slot]
    );
}

#[test]
fn light_children_of_a_host_are_reached_only_through_slots() {
    let f = shadow_fixture(true);
    let q = engine(&f.dom);
    // span.title is assigned and therefore visible; span.meta is not
    assert_eq!(
        q.query_selector_all("span", f.dom.document()).unwrap(),
        vec![f.title]
    );
    assert_eq!(q.query_selector(".meta", f.dom.document()).unwrap(), None);
}

#[test]
fn slotted_elements_match_through_their_projected_position() {
    let f = shadow_fixture(true);
    let q = engine(&f.dom);
    assert_eq!(
        q.query_selector(".card-inner .title", f.dom.document())
            .unwrap(),
        Some(f.title)
    );
    assert_eq!(
        q.query_selector("x-card .title", f.dom.document()).unwrap(),
        Some(f.title)
    );
}

#[test]
fn empty_slot_exposes_its_fallback_content() {
    let f = shadow_fixture(false);
    let q = engine(&f.dom);
    assert_eq!(
        q.query_selector(".fallback", f.dom.document()).unwrap(),
        Some(f.fallback)
    );
}

#[test]
fn assigned_slot_hides_fallback_and_never_duplicates() {
    let mut f = shadow_fixture(false);
    f.dom.assign_slot(f.default_slot, &[f.meta]).unwrap();
    let q = engine(&f.dom);
    assert_eq!(q.query_selector(".fallback", f.dom.document()).unwrap(), None);
    let metas = q.query_selector_all(".meta", f.dom.document()).unwrap();
    assert_eq!(metas, vec![f.meta]);
}

#[test]
fn walk_order_is_composed_pre_order() {
    let f = shadow_fixture(true);
    let q = engine(&f.dom);
    let all = q.query_selector_all("*", f.card).unwrap();
    assert_eq!(
        all,
        vec![f.inner, f.named_slot, f.title, f.default_slot, f.fallback]
    );
}

#[test]
fn closest_walks_composed_ancestors() {
    let f = shadow_fixture(true);
    let q = engine(&f.dom);
    assert_eq!(
        q.closest(".title", f.title).unwrap(),
        Some(f.title),
        "an element is its own closest match"
    );
    assert_eq!(q.closest(".card-inner", f.title).unwrap(), Some(f.inner));
    assert_eq!(q.closest("x-card", f.title).unwrap(), Some(f.card));
    assert_eq!(q.closest("body", f.title).unwrap(), {
        let body = q.query_selector("body", f.dom.document()).unwrap();
        body
    });
    assert_eq!(q.closest(".absent", f.title).unwrap(), None);
}

#[test]
fn matches_tests_the_element_in_place() {
    let f = light_fixture();
    let q = engine(&f.dom);
    assert!(q.matches("p.text", f.intro).unwrap());
    assert!(q.matches("div p", f.intro).unwrap());
    assert!(!q.matches("h1", f.intro).unwrap());
}

#[test]
fn matches_and_closest_reject_non_elements() {
    let f = shadow_fixture(true);
    let q = engine(&f.dom);
    let shadow_root = q.query_selector(".card-inner", f.dom.document()).unwrap();
    assert!(shadow_root.is_some());
    match q.matches("div", f.dom.document()) {
        Err(Error::InvalidElement(_)) => {}
        other => panic!("expected invalid element, got {other:?}"),
    }
    match q.closest("div", f.dom.document()) {
        Err(Error::InvalidElement(_)) => {}
        other => panic!("expected invalid element, got {other:?}"),
    }
}

#[test]
fn element_by_id_requires_a_document_like_context() {
    let f = light_fixture();
    let q = engine(&f.dom);
    assert_eq!(
        q.element_by_id("title", f.dom.document()).unwrap(),
        Some(f.heading)
    );
    assert_eq!(q.element_by_id("absent", f.dom.document()).unwrap(), None);
    match q.element_by_id("title", f.body) {
        Err(Error::InvalidContext(_)) => {}
        other => panic!("expected invalid context, got {other:?}"),
    }
}

#[test]
fn element_by_id_accepts_a_shadow_root_context() {
    let mut f = shadow_fixture(true);
    f.dom.set_attr(f.inner, "id", "inner").unwrap();
    let shadow = f.dom.shadow_root(f.card).unwrap();
    let q = engine(&f.dom);
    assert_eq!(q.element_by_id("inner", shadow).unwrap(), Some(f.inner));
}

#[test]
fn elements_by_name_matches_the_name_attribute_exactly() {
    let f = light_fixture();
    let q = engine(&f.dom);
    assert_eq!(
        q.elements_by_name("description", f.dom.document()).unwrap(),
        vec![f.intro]
    );
    assert_eq!(
        q.elements_by_name("Description", f.dom.document()).unwrap(),
        Vec::<NodeId>::new()
    );
    match q.elements_by_name("description", f.container) {
        Err(Error::InvalidContext(_)) => {}
        other => panic!("expected invalid context, got {other:?}"),
    }
}

#[test]
fn elements_by_tag_name_is_case_insensitive_with_wildcard() {
    let f = light_fixture();
    let q = engine(&f.dom);
    assert_eq!(
        q.elements_by_tag_name("P", f.dom.document()),
        vec![f.intro, f.outro]
    );
    let all = q.elements_by_tag_name("*", f.dom.document());
    assert_eq!(all.len(), 6);
}

#[test]
fn elements_by_class_name_requires_every_token() {
    let f = light_fixture();
    let q = engine(&f.dom);
    assert_eq!(
        q.elements_by_class_name("text", f.dom.document()),
        vec![f.intro, f.outro]
    );
    assert_eq!(
        q.elements_by_class_name(" text\tintro\n", f.dom.document()),
        vec![f.intro]
    );
    assert!(
        q.elements_by_class_name("text absent", f.dom.document())
            .is_empty()
    );
    assert!(q.elements_by_class_name("  ", f.dom.document()).is_empty());
}

#[test]
fn namespace_lookup_wildcards_and_empty_namespace() {
    const SVG_NS: &str = "http://www.w3.org/2000/svg";
    let mut dom = Dom::new();
    let html = dom.create_element(dom.document(), "html");
    let body = dom.create_element(html, "body");
    let svg = dom.create_element_ns(body, SVG_NS, "svg");
    let gradient = dom.create_element_ns(svg, SVG_NS, "linearGradient");
    let q = engine(&dom);

    let everything = q.elements_by_tag_name_ns("*", "*", dom.document());
    assert_eq!(everything.len(), 4);
    assert!(q.elements_by_tag_name_ns("", "*", dom.document()).is_empty());
    assert_eq!(
        q.elements_by_tag_name_ns(SVG_NS, "*", dom.document()),
        vec![svg, gradient]
    );
}

#[test]
fn namespace_lookup_recovers_original_case_tag_names() {
    const SVG_NS: &str = "http://www.w3.org/2000/svg";
    let mut dom = Dom::new();
    let html = dom.create_element(dom.document(), "html");
    let svg = dom.create_element_ns(html, SVG_NS, "svg");
    let gradient = dom.create_element_ns(svg, SVG_NS, "linearGradient");
    let q = engine(&dom);

    assert_eq!(
        q.elements_by_tag_name_ns(SVG_NS, "linearGradient", dom.document()),
        vec![gradient]
    );
    // the NS form is case sensitive, unlike the plain form
    assert!(
        q.elements_by_tag_name_ns(SVG_NS, "lineargradient", dom.document())
            .is_empty()
    );
    assert_eq!(
        q.elements_by_tag_name("lineargradient", dom.document()),
        vec![gradient]
    );
}

#[test]
fn unsupported_pseudo_classes_read_as_plain_non_matches() {
    let f = light_fixture();
    let q = engine(&f.dom);
    // :hover is outside the structural matcher's vocabulary; the query
    // itself still succeeds and simply matches nothing
    assert_eq!(
        q.query_selector_all("p:hover", f.dom.document()).unwrap(),
        Vec::<NodeId>::new()
    );
    assert!(!q.matches("p:hover", f.intro).unwrap());
}

#[test]
fn structural_pseudo_classes_work_through_the_engine() {
    let f = light_fixture();
    let q = engine(&f.dom);
    assert_eq!(
        q.query_selector("p:first-of-type", f.dom.document())
            .unwrap(),
        Some(f.intro)
    );
    assert_eq!(
        q.query_selector(".container :last-child", f.dom.document())
            .unwrap(),
        Some(f.outro)
    );
    assert_eq!(
        q.query_selector_all("p:not(.intro)", f.dom.document())
            .unwrap(),
        vec![f.outro]
    );
    assert_eq!(
        q.query_selector_all("[name=description]", f.dom.document())
            .unwrap(),
        vec![f.intro]
    );
}
