mod common;

use common::{
    insert_row, node_row_count, reject_name, setup, CountingRepo, CUSTOMER, PROJECT, TASK,
};
use timetally_core::{
    AttributeEdit, ChangeNotice, NewNode, Node, NodeAddress, NodeKind, NodeRepository,
    SqliteNodeRepository, TreeError, TreeStore,
};

fn names<R: NodeRepository>(tree: &mut TreeStore<R>, parent: Option<NodeAddress>) -> Vec<String> {
    let count = tree.child_count(parent);
    (0..count)
        .map(|row| {
            let address = tree.child(parent, row).unwrap();
            tree.node(address).unwrap().name.clone()
        })
        .collect()
}

#[test]
fn resolves_customer_and_project_by_row() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Website", PROJECT, Some(1));
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    assert_eq!(tree.child_count(None), 1);
    let acme = tree.child(None, 0).unwrap();
    assert_eq!(tree.node(acme).unwrap().name, "Acme");
    assert_eq!(tree.node(acme).unwrap().kind(), NodeKind::Customer);

    assert_eq!(tree.child_count(Some(acme)), 1);
    let website = tree.child(Some(acme), 0).unwrap();
    assert_eq!(tree.node(website).unwrap().name, "Website");
    assert_eq!(tree.parent_of(website), Some(acme));
    assert_eq!(tree.parent_of(acme), None);
}

#[test]
fn child_count_fetches_each_node_at_most_once() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Website", PROJECT, Some(1));
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mut tree = TreeStore::new(&repo);
    assert_eq!(repo.list_calls.get(), 1);

    for _ in 0..3 {
        assert_eq!(tree.child_count(None), 1);
    }
    assert_eq!(repo.list_calls.get(), 1);

    let acme = tree.child(None, 0).unwrap();
    for _ in 0..3 {
        assert_eq!(tree.child_count(Some(acme)), 1);
        tree.child(Some(acme), 0).unwrap();
    }
    assert_eq!(repo.list_calls.get(), 2);
}

#[test]
fn failed_fetch_is_retried_on_next_access() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    repo.fail_list.set(true);
    let mut tree = TreeStore::new(&repo);

    assert_eq!(tree.child_count(None), 0);
    assert_eq!(repo.list_calls.get(), 2);

    repo.fail_list.set(false);
    assert_eq!(tree.child_count(None), 1);
    assert_eq!(tree.child_count(None), 1);
    assert_eq!(repo.list_calls.get(), 3);
}

#[test]
fn out_of_range_row_yields_none_without_panicking() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    assert!(tree.child(None, 1).is_none());
    assert!(matches!(
        tree.try_child(None, 5),
        Err(TreeError::OutOfRange { row: 5, len: 1 })
    ));
}

#[test]
fn fetch_orders_by_name_and_new_children_are_appended() {
    let conn = setup();
    insert_row(&conn, 1, "Zeta", CUSTOMER, None);
    insert_row(&conn, 2, "Acme", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    assert_eq!(names(&mut tree, None), vec!["Acme", "Zeta"]);

    let before = tree.child_count(None);
    let added = tree
        .create_child(None, NodeKind::Customer, NewNode::named("Beta"))
        .unwrap();
    assert_eq!(added.row(), before);
    assert_eq!(names(&mut tree, None), vec!["Acme", "Zeta", "Beta"]);
}

#[test]
fn create_child_after_realized_sibling_keeps_existing_positions() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    assert_eq!(tree.child_count(None), 1);

    let beta = tree
        .create_child(None, NodeKind::Customer, NewNode::named("Beta"))
        .unwrap();
    assert_eq!(beta.row(), 1);
    assert_eq!(tree.parent_of(beta), None);

    let row1 = tree.child(None, 1).unwrap();
    assert_eq!(row1, beta);
    assert_eq!(tree.node(row1).unwrap().name, "Beta");
    let row0 = tree.child(None, 0).unwrap();
    assert_eq!(tree.node(row0).unwrap().name, "Acme");

    let stored = tree
        .repository()
        .get_node(tree.node(beta).unwrap().id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.parent, None);
    assert_eq!(stored.type_code, CUSTOMER);
}

#[test]
fn nested_add_persists_parent_id_and_is_not_fetched_twice() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Website", PROJECT, Some(1));
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let acme = tree.child(None, 0).unwrap();

    // Parent children are not realized yet; the add must realize them first.
    let apps = tree
        .create_child(Some(acme), NodeKind::Project, NewNode::named("Apps"))
        .unwrap();
    assert_eq!(apps.row(), 1);
    assert_eq!(tree.child_count(Some(acme)), 2);
    assert_eq!(names(&mut tree, Some(acme)), vec!["Website", "Apps"]);

    let id = tree.node(apps).unwrap().id.unwrap();
    let stored = tree.repository().get_node(id).unwrap().unwrap();
    assert_eq!(stored.parent, Some(1));
}

#[test]
fn create_child_without_name_uses_kind_default() {
    let conn = setup();
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    let address = tree
        .create_child(None, NodeKind::Customer, NewNode::default())
        .unwrap();
    let node = tree.node(address).unwrap();
    assert_eq!(node.name, "New Customer");
    assert!(node.id.is_some());
}

#[test]
fn create_child_rejects_blank_name_before_store_call() {
    let conn = setup();
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mut tree = TreeStore::new(&repo);

    let err = tree
        .create_child(None, NodeKind::Folder, NewNode::named("   "))
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidName));
    assert_eq!(repo.flush_calls.get(), 0);
    assert_eq!(tree.child_count(None), 0);
}

#[test]
fn add_node_rejects_stored_node_without_moving_it() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Beta", CUSTOMER, None);
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mut tree = TreeStore::new(&repo);
    let beta = tree.child(None, 1).unwrap();
    assert_eq!(tree.child_count(Some(beta)), 0);
    tree.drain_notices();

    let mut copy = Node::pending(NodeKind::Customer);
    copy.id = Some(1);
    copy.name = "Acme".to_string();
    let err = tree.add_node(Some(beta), copy).unwrap_err();

    assert!(matches!(err, TreeError::AlreadyPersisted { id: 1 }));
    assert_eq!(repo.flush_calls.get(), 0);
    assert_eq!(tree.child_count(Some(beta)), 0);
    assert_eq!(names(&mut tree, None), vec!["Acme", "Beta"]);
    assert_eq!(repo.get_node(1).unwrap().unwrap().parent, None);
    assert!(tree.drain_notices().is_empty());
}

#[test]
fn failed_add_leaves_tree_and_store_untouched() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    reject_name(&conn, "Forbidden");
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    assert_eq!(tree.child_count(None), 1);
    tree.drain_notices();

    let err = tree
        .create_child(None, NodeKind::Customer, NewNode::named("Forbidden"))
        .unwrap_err();
    assert!(matches!(err, TreeError::Storage(_)));
    assert_eq!(tree.child_count(None), 1);
    assert_eq!(node_row_count(&conn), 1);
    assert!(tree.drain_notices().is_empty());
}

#[test]
fn add_node_assigns_id_and_later_edits_update_same_row() {
    let conn = setup();
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    let pending = Node::pending(NodeKind::Customer);
    assert!(pending.id.is_none());
    let address = tree.add_node(None, pending).unwrap();
    let id = tree.node(address).unwrap().id.unwrap();
    assert_eq!(node_row_count(&conn), 1);

    tree.rename(address, "Acme").unwrap();
    assert_eq!(node_row_count(&conn), 1);
    assert_eq!(tree.node(address).unwrap().id, Some(id));
    let stored = tree.repository().get_node(id).unwrap().unwrap();
    assert_eq!(stored.name, "Acme");
}

#[test]
fn rename_to_blank_is_rejected_and_changes_nothing() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mut tree = TreeStore::new(&repo);
    let acme = tree.child(None, 0).unwrap();

    assert!(matches!(tree.rename(acme, ""), Err(TreeError::InvalidName)));
    assert!(matches!(tree.rename(acme, " \t"), Err(TreeError::InvalidName)));
    assert_eq!(repo.flush_calls.get(), 0);
    assert_eq!(tree.node(acme).unwrap().name, "Acme");
    assert_eq!(repo.get_node(1).unwrap().unwrap().name, "Acme");
}

#[test]
fn failed_rename_keeps_in_memory_name() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    reject_name(&conn, "Forbidden");
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let acme = tree.child(None, 0).unwrap();
    tree.drain_notices();

    let err = tree.rename(acme, "Forbidden").unwrap_err();
    assert!(matches!(err, TreeError::Storage(_)));
    assert_eq!(tree.node(acme).unwrap().name, "Acme");
    assert!(tree.drain_notices().is_empty());
}

#[test]
fn rename_emits_row_precise_data_changed_notice() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Beta", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let beta = tree.child(None, 1).unwrap();
    tree.drain_notices();

    tree.rename(beta, "  Beta Ltd ").unwrap();
    assert_eq!(tree.node(beta).unwrap().name, "Beta Ltd");
    assert_eq!(
        tree.drain_notices(),
        vec![ChangeNotice::DataChanged { index: beta }]
    );
}

#[test]
fn add_emits_rows_inserted_under_parent() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let acme = tree.child(None, 0).unwrap();
    tree.drain_notices();

    let project = tree
        .create_child(Some(acme), NodeKind::Project, NewNode::named("Website"))
        .unwrap();
    let task = tree
        .create_child(Some(project), NodeKind::Task, NewNode::named("Design"))
        .unwrap();

    assert_eq!(
        tree.drain_notices(),
        vec![
            ChangeNotice::RowsInserted {
                parent: Some(acme),
                first: 0,
                last: 0,
            },
            ChangeNotice::RowsInserted {
                parent: Some(project),
                first: 0,
                last: 0,
            },
        ]
    );
    assert_eq!(tree.parent_of(task), Some(project));
    assert!(tree.drain_notices().is_empty());
}

#[test]
fn unknown_type_codes_are_skipped_without_aborting_siblings() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Broken", 99, None);
    insert_row(&conn, 3, "Zeta", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    assert_eq!(names(&mut tree, None), vec!["Acme", "Zeta"]);
}

#[test]
fn root_cannot_be_renamed_or_created() {
    let conn = setup();
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    assert!(matches!(
        tree.create_child(None, NodeKind::Root, NewNode::named("Root")),
        Err(TreeError::RootNotEditable)
    ));
    assert!(tree.address_of(tree.root_handle()).is_none());
}

#[test]
fn update_attributes_persists_leaf_fields() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Design", TASK, Some(1));
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let acme = tree.child(None, 0).unwrap();
    let design = tree.child(Some(acme), 0).unwrap();

    tree.update_attributes(
        design,
        AttributeEdit {
            descr: Some("wireframes".to_string()),
            active: Some(false),
            charge: Some(85),
        },
    )
    .unwrap();

    let attributes = tree.attributes(design).unwrap();
    assert_eq!(attributes.description, "wireframes");
    assert!(!attributes.active);
    assert_eq!(attributes.charge, 85);
    assert_eq!(attributes.icon_key, "task");

    let stored = tree.repository().get_node(2).unwrap().unwrap();
    assert_eq!(stored.charge, 85);
    assert_eq!(stored.parent, Some(1));
}

#[test]
fn attributes_serialize_for_presentation_layers() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let acme = tree.child(None, 0).unwrap();

    let json = serde_json::to_value(tree.attributes(acme).unwrap()).unwrap();
    assert_eq!(json["name"], "Acme");
    assert_eq!(json["type"], "customer");
    assert_eq!(json["icon_key"], "customer");
    assert_eq!(json["id"], 1);
}

#[test]
fn reload_invalidates_addresses_and_refetches() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mut tree = TreeStore::new(&repo);
    let acme = tree.child(None, 0).unwrap();
    tree.drain_notices();

    insert_row(&conn, 2, "Beta", CUSTOMER, None);
    tree.reload();

    assert!(tree.node(acme).is_none());
    assert!(matches!(tree.rename(acme, "Gone"), Err(TreeError::StaleAddress)));
    assert_eq!(tree.child_count(Some(acme)), 0);
    assert_eq!(tree.drain_notices(), vec![ChangeNotice::Reset]);
    assert_eq!(names(&mut tree, None), vec!["Acme", "Beta"]);
    assert_eq!(repo.list_calls.get(), 2);
}

#[test]
fn realize_all_fetches_every_level() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Website", PROJECT, Some(1));
    insert_row(&conn, 3, "Design", TASK, Some(2));
    insert_row(&conn, 4, "Beta", CUSTOMER, None);
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());
    assert_eq!(tree.realized_len(), 3);

    assert_eq!(tree.realize_all().unwrap(), 5);
    let acme = tree.child(None, 0).unwrap();
    let website = tree.child(Some(acme), 0).unwrap();
    assert!(tree.node(website).unwrap().is_fetched());
}

#[test]
fn locate_finds_realized_nodes_by_id_only() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Website", PROJECT, Some(1));
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn).unwrap());

    assert!(tree.locate(2).is_none());
    let acme = tree.locate(1).unwrap();
    assert_eq!(tree.child_count(Some(acme)), 1);
    let website = tree.locate(2).unwrap();
    assert_eq!(website.row(), 0);
    assert_eq!(tree.parent_of(website), Some(acme));
}

#[test]
fn reveal_fetches_only_the_ancestor_chain() {
    let conn = setup();
    insert_row(&conn, 1, "Acme", CUSTOMER, None);
    insert_row(&conn, 2, "Website", PROJECT, Some(1));
    insert_row(&conn, 3, "Design", TASK, Some(2));
    insert_row(&conn, 4, "Beta", CUSTOMER, None);
    insert_row(&conn, 5, "Shop", PROJECT, Some(4));
    let repo = CountingRepo::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mut tree = TreeStore::new(&repo);
    let before = repo.list_calls.get();

    let design = tree.reveal(3).unwrap().unwrap();
    assert_eq!(tree.node(design).unwrap().name, "Design");
    assert_eq!(repo.list_calls.get(), before + 2);
    let website = tree.parent_of(design).unwrap();
    assert_eq!(tree.node(website).unwrap().name, "Website");
    assert!(tree.locate(5).is_none());

    assert_eq!(tree.reveal(3).unwrap(), Some(design));
    assert_eq!(repo.list_calls.get(), before + 2);
    assert!(tree.reveal(404).unwrap().is_none());
}
