use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::entry::{RootType, VolumeInfo, VolumeType};
use crate::grouping::GroupingKind;
use crate::metadata::{EntryMetadata, MetadataUpdate};
use crate::node::{HasChildren, Icon};
use crate::roots::{RootDescriptor, Section};
use crate::testing::{MemoryMetadata, MemoryNamespace, RecordingModel};

struct Fixture {
    ns: MemoryNamespace,
    model: Arc<RecordingModel>,
    metadata: Arc<MemoryMetadata>,
    tree: Arc<DirectoryTree>,
}

fn fixture_with(settings: TreeSettings) -> Fixture {
    let ns = MemoryNamespace::new();
    let model = Arc::new(RecordingModel::default());
    let metadata = Arc::new(MemoryMetadata::default());
    let tree = Arc::new(DirectoryTree::new(
        Arc::new(ns.clone()),
        metadata.clone(),
        model.clone(),
        settings,
    ));
    Fixture {
        ns,
        model,
        metadata,
        tree,
    }
}

fn fixture() -> Fixture {
    fixture_with(TreeSettings::default())
}

fn labels(tree: &DirectoryTree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .into_iter()
        .filter_map(|c| tree.node(c))
        .map(|n| n.label().to_string())
        .collect()
}

fn dir(url: &str) -> Entry {
    Entry::directory(url)
}

async fn local_tree(f: &Fixture, dirs: &[&str]) -> NodeId {
    let volume = f.ns.add_local_volume("local");
    for d in dirs {
        f.ns.add_dir(&format!("mem://local/{}", d));
    }
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::MyFiles)])
        .await;
    f.tree.roots()[0]
}

#[tokio::test]
async fn test_children_sorted_regardless_of_listing_order() {
    let f = fixture();
    let root = local_tree(&f, &["b", "a"]).await;

    f.tree.expand(root).await.unwrap();

    assert_eq!(labels(&f.tree, root), vec!["a", "b"]);
    let node = f.tree.node(root).unwrap();
    assert!(node.is_expanded());
    assert_eq!(node.has_children(), HasChildren::Yes);
}

#[tokio::test]
async fn test_second_refresh_is_a_noop() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/x", "b"]).await;
    f.tree.expand(root).await.unwrap();
    let a = f.tree.find(&dir("mem://local/a")).unwrap();
    f.tree.expand(a).await.unwrap();

    f.tree.update_sub_directories(root, true).await.unwrap();
    let before = f.tree.snapshot();
    let outcome = f.tree.update_sub_directories(root, true).await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::Applied(summary) if summary.is_noop()));
    assert_eq!(before, f.tree.snapshot());
}

#[tokio::test]
async fn test_new_children_land_in_order() {
    let f = fixture();
    let root = local_tree(&f, &["a", "c"]).await;
    f.tree.expand(root).await.unwrap();
    let a = f.tree.find(&dir("mem://local/a")).unwrap();

    f.ns.add_dir("mem://local/b");
    f.ns.add_dir("mem://local/aa");
    let outcomes = f
        .tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://local"),
        })
        .await;

    assert_eq!(
        outcomes,
        vec![PropagationOutcome::Refreshed {
            entry: dir("mem://local")
        }]
    );
    assert_eq!(labels(&f.tree, root), vec!["a", "aa", "b", "c"]);
    // kept nodes keep their identity
    assert_eq!(f.tree.find(&dir("mem://local/a")), Some(a));
}

#[tokio::test]
async fn test_busy_node_ignores_refresh() {
    let f = fixture();
    let root = local_tree(&f, &["a"]).await;
    f.tree.state.lock().node_mut(root).unwrap().loading = true;

    let outcome = f.tree.update_sub_directories(root, false).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Busy);

    f.tree.expand(root).await.unwrap();
    assert!(!f.tree.node(root).unwrap().is_expanded());
}

#[tokio::test]
async fn test_unreadable_directory_has_no_children() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/x"]).await;
    f.tree.expand(root).await.unwrap();
    let a = f.tree.find(&dir("mem://local/a")).unwrap();
    f.ns.set_unreadable("mem://local/a");

    f.tree.expand(a).await.unwrap();

    let node = f.tree.node(a).unwrap();
    assert!(node.children().is_empty());
    assert_eq!(node.has_children(), HasChildren::No);
    assert!(!node.is_expanded());
}

#[tokio::test]
async fn test_grouping_appears_and_disappears_at_fixed_index() {
    let f = fixture();
    let volume = f.ns.add_drive_volume();
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Cloud)])
        .await;
    let drive = f.tree.roots()[0];
    assert_eq!(labels(&f.tree, drive), vec!["My Drive", "Offline"]);

    f.ns.add_dir("mem://drive/team_drives/Team A");
    f.tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://drive/team_drives"),
        })
        .await;
    assert_eq!(
        labels(&f.tree, drive),
        vec!["My Drive", "Shared drives", "Offline"]
    );
    let shared = f.tree.children(drive)[1];
    assert_eq!(
        f.tree.node(shared).unwrap().grouping(),
        Some(GroupingKind::SharedDrives)
    );
    assert_eq!(labels(&f.tree, shared), vec!["Team A"]);

    f.ns.add_dir("mem://drive/Computers/Laptop");
    f.tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://drive/Computers/Laptop"),
        })
        .await;
    assert_eq!(
        labels(&f.tree, drive),
        vec!["My Drive", "Shared drives", "Computers", "Offline"]
    );

    f.ns.remove("mem://drive/team_drives/Team A");
    f.tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://drive/team_drives"),
        })
        .await;
    assert_eq!(
        labels(&f.tree, drive),
        vec!["My Drive", "Computers", "Offline"]
    );
    assert!(f.tree.node(shared).is_none());

    f.ns.add_dir("mem://drive/team_drives/Team B");
    f.tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://drive/team_drives/Team B"),
        })
        .await;
    assert_eq!(
        labels(&f.tree, drive),
        vec!["My Drive", "Shared drives", "Computers", "Offline"]
    );
}

#[tokio::test]
async fn test_hidden_fake_entries() {
    let f = fixture_with(TreeSettings {
        fake_entries_visible: false,
        ..TreeSettings::default()
    });
    let volume = f.ns.add_drive_volume();
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Cloud)])
        .await;
    assert_eq!(labels(&f.tree, f.tree.roots()[0]), vec!["My Drive"]);
}

#[tokio::test]
async fn test_selection_survives_unrelated_mutation() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/x", "b"]).await;

    let outcome = f.tree.select_by_entry(&dir("mem://local/a/x")).await.unwrap();
    let x = f.tree.find(&dir("mem://local/a/x")).unwrap();
    assert_eq!(outcome, SelectOutcome::Selected(x));
    assert!(f.tree.node(root).unwrap().is_expanded());

    f.ns.add_dir("mem://local/c");
    f.tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://local"),
        })
        .await;

    assert_eq!(f.tree.selected(), Some(x));
    assert_eq!(
        f.tree.select_by_entry(&dir("mem://local/a/x")).await.unwrap(),
        SelectOutcome::Unchanged
    );

    f.tree.clear_selection();
    assert_eq!(
        f.tree.select_by_entry(&dir("mem://local/a/x")).await.unwrap(),
        SelectOutcome::Selected(x)
    );
}

#[tokio::test]
async fn test_removing_selected_node_clears_selection() {
    let f = fixture();
    local_tree(&f, &["a", "a/x", "b"]).await;
    f.tree.select_by_entry(&dir("mem://local/a/x")).await.unwrap();

    f.ns.remove("mem://local/a");
    let outcomes = f
        .tree
        .handle_change(ChangeEvent::EntriesChanged {
            kind: EntryChangeKind::Deleted,
            entries: vec![dir("mem://local/a")],
        })
        .await;

    assert_eq!(
        outcomes,
        vec![PropagationOutcome::Refreshed {
            entry: dir("mem://local")
        }]
    );
    assert_eq!(f.tree.selected(), None);
    assert!(f.tree.find(&dir("mem://local/a/x")).is_none());
}

#[tokio::test]
async fn test_unknown_entry_clears_selection() {
    let f = fixture();
    local_tree(&f, &["a"]).await;
    f.tree.select_by_entry(&dir("mem://local/a")).await.unwrap();

    let outcome = f.tree.select_by_entry(&dir("mem://local/missing")).await.unwrap();
    assert_eq!(outcome, SelectOutcome::NotFound);
    assert_eq!(f.tree.selected(), None);
}

#[tokio::test(start_paused = true)]
async fn test_stale_volume_resolution_is_dropped() {
    let f = fixture();
    let slow = f.ns.add_local_volume("slow");
    let fast = f.ns.add_local_volume("fast");
    f.ns.add_dir("mem://fast/y");
    f.ns.set_resolve_failure("fast", true);
    f.tree
        .set_root_descriptors(vec![
            RootDescriptor::volume(slow, Section::MyFiles),
            RootDescriptor::volume(fast, Section::Removable),
        ])
        .await;
    f.ns.set_resolve_failure("fast", false);
    f.ns.set_resolve_delay("slow", Duration::from_secs(10));

    let tree = f.tree.clone();
    let pending =
        tokio::spawn(async move { tree.select_by_entry(&dir("mem://slow/ghost")).await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let y = dir("mem://fast/y");
    let outcome = f.tree.select_by_entry(&y).await.unwrap();
    let selected = f.tree.find(&y).unwrap();
    assert_eq!(outcome, SelectOutcome::Selected(selected));

    assert_eq!(pending.await.unwrap().unwrap(), SelectOutcome::Superseded);
    assert_eq!(f.tree.selected(), Some(selected));
    assert_eq!(f.ns.resolve_count("slow"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_later_selection_wins_over_slow_listing() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/mid", "a/mid/deep", "b"]).await;
    f.tree.expand(root).await.unwrap();
    assert!(f.tree.find(&dir("mem://local/a/mid")).is_some());
    f.ns.set_read_delay("mem://local/a/mid", Duration::from_secs(10));

    let tree = f.tree.clone();
    let pending =
        tokio::spawn(async move { tree.select_by_entry(&dir("mem://local/a/mid/deep")).await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let b = f.tree.find(&dir("mem://local/b")).unwrap();
    let outcome = f.tree.select_by_entry(&dir("mem://local/b")).await.unwrap();
    assert_eq!(outcome, SelectOutcome::Selected(b));

    assert_eq!(pending.await.unwrap().unwrap(), SelectOutcome::Superseded);
    assert_eq!(f.tree.selected(), Some(b));
    // the slow listing itself still landed
    assert!(f.tree.find(&dir("mem://local/a/mid/deep")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_refresh_releases_node() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/x"]).await;
    f.tree.expand(root).await.unwrap();
    let a = f.tree.find(&dir("mem://local/a")).unwrap();
    f.ns.set_read_delay("mem://local/a", Duration::from_secs(10));

    let timed_out =
        tokio::time::timeout(Duration::from_secs(1), f.tree.update_sub_directories(a, false)).await;
    assert!(timed_out.is_err());
    assert!(!f.tree.node(a).unwrap().is_loading());

    f.ns.set_read_delay("mem://local/a", Duration::ZERO);
    let outcome = f.tree.update_sub_directories(a, false).await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::Applied(_)));
    assert_eq!(labels(&f.tree, a), vec!["x"]);
}

#[tokio::test]
async fn test_revealed_drive_folders_listen_for_metadata() {
    let f = fixture();
    let volume = f.ns.add_drive_volume();
    f.ns.add_dir("mem://drive/root/folder");
    f.ns.add_dir("mem://drive/root/folder/sub");
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Cloud)])
        .await;
    let drive = f.tree.roots()[0];

    let sub = dir("mem://drive/root/folder/sub");
    let outcome = f.tree.select_by_entry(&sub).await.unwrap();
    assert!(matches!(outcome, SelectOutcome::Selected(_)));

    let my_drive = f.tree.children(drive)[0];
    let folder = f.tree.find(&dir("mem://drive/root/folder")).unwrap();
    assert!(f.tree.node(folder).unwrap().is_expanded());
    assert!(f.metadata.is_subscribed(drive));
    assert!(f.metadata.is_subscribed(my_drive));
    assert!(f.metadata.is_subscribed(folder));

    f.metadata.set(
        sub.url(),
        EntryMetadata {
            shared: true,
            ..EntryMetadata::default()
        },
    );
    let update = MetadataUpdate::new([sub.url()], ["shared"]);
    assert_eq!(f.tree.on_metadata_updated(&update), 1);
}

#[tokio::test]
async fn test_change_below_unlisted_node_is_not_shown() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/x", "a/x/y"]).await;
    f.tree.expand(root).await.unwrap();
    assert!(f.tree.find(&dir("mem://local/a/x/y")).is_none());

    let outcome = f.tree.update_tree_by_entry(&dir("mem://local/a/x/y")).await;
    assert_eq!(
        outcome,
        PropagationOutcome::NotShown {
            entry: dir("mem://local/a/x/y")
        }
    );
}

#[tokio::test]
async fn test_deleted_directory_walks_up_one_level() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/b", "a/b/c"]).await;
    f.tree.select_by_entry(&dir("mem://local/a/b/c")).await.unwrap();
    let b = f.tree.find(&dir("mem://local/a/b")).unwrap();
    f.ns.reset_counts();

    f.ns.remove("mem://local/a/b/c");
    let outcomes = f
        .tree
        .handle_change(ChangeEvent::DirectoryChanged {
            entry: dir("mem://local/a/b/c"),
        })
        .await;

    assert_eq!(
        outcomes,
        vec![PropagationOutcome::Refreshed {
            entry: dir("mem://local/a/b")
        }]
    );
    assert_eq!(f.ns.read_count("mem://local/a/b"), 1);
    assert_eq!(f.ns.read_count("mem://local/a"), 0);
    assert_eq!(f.ns.read_count("mem://local"), 0);
    assert!(f.tree.children(b).is_empty());
    assert_eq!(f.tree.node(b).unwrap().has_children(), HasChildren::No);
    assert!(f.tree.node(root).unwrap().is_expanded());
}

#[tokio::test]
async fn test_walk_cap_falls_back_to_volume() {
    let f = fixture_with(TreeSettings {
        max_change_walk_depth: Some(0),
        ..TreeSettings::default()
    });
    let root = local_tree(&f, &["a", "b"]).await;
    f.ns.remove("mem://local/a");

    let outcome = f.tree.update_tree_by_entry(&dir("mem://local/a")).await;

    assert_eq!(
        outcome,
        PropagationOutcome::VolumeFallback {
            volume_id: "local".to_string()
        }
    );
    assert_eq!(labels(&f.tree, root), vec!["b"]);

    let outcome = f.tree.update_tree_by_entry(&dir("mem://nowhere/x")).await;
    assert_eq!(outcome, PropagationOutcome::Dropped);
}

#[tokio::test]
async fn test_created_entries_refresh_their_parent() {
    let f = fixture();
    let root = local_tree(&f, &["a"]).await;

    let fresh = f.ns.add_dir("mem://local/new");
    f.tree
        .handle_change(ChangeEvent::EntriesChanged {
            kind: EntryChangeKind::Created,
            entries: vec![fresh, Entry::file("mem://local/notes.txt")],
        })
        .await;

    assert_eq!(labels(&f.tree, root), vec!["a", "new"]);
}

#[tokio::test]
async fn test_delayed_expansion_stays_shallow() {
    let f = fixture();
    let volume = VolumeInfo::new("fsp", VolumeType::Provided, "Archive");
    f.ns.add_volume(volume.clone(), "mem://fsp");
    for d in ["a", "a/x", "b"] {
        f.ns.add_dir(&format!("mem://fsp/{}", d));
    }
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Removable)])
        .await;
    let root = f.tree.roots()[0];

    f.tree.expand(root).await.unwrap();
    let a = f.tree.find(&dir("mem://fsp/a")).unwrap();
    let b = f.tree.find(&dir("mem://fsp/b")).unwrap();
    assert_eq!(f.ns.read_count("mem://fsp/a"), 0);
    assert_eq!(f.ns.read_count("mem://fsp/b"), 0);
    assert_eq!(f.tree.node(b).unwrap().has_children(), HasChildren::Yes);
    assert!(f.tree.node(b).unwrap().delay_expansion());

    f.tree.expand(a).await.unwrap();
    assert_eq!(labels(&f.tree, a), vec!["x"]);

    f.tree.collapse(root).unwrap();
    assert!(!f.tree.node(a).unwrap().is_expanded());
    assert_eq!(labels(&f.tree, a), vec!["x"]);

    f.tree.expand(root).await.unwrap();
    assert_eq!(f.ns.read_count("mem://fsp/a"), 1);
}

#[tokio::test]
async fn test_media_view_never_lists() {
    let f = fixture();
    let volume = VolumeInfo::new("images", VolumeType::MediaView, "Images");
    f.ns.add_volume(volume.clone(), "mem://images");
    f.ns.add_dir("mem://images/2024");
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Top)])
        .await;
    let root = f.tree.roots()[0];

    f.tree.expand(root).await.unwrap();

    assert!(f.tree.children(root).is_empty());
    assert_eq!(f.ns.read_count("mem://images"), 0);
    assert_eq!(f.tree.node(root).unwrap().has_children(), HasChildren::No);
}

#[tokio::test]
async fn test_metadata_listener_lifecycle_and_icons() {
    let f = fixture();
    let volume = f.ns.add_drive_volume();
    f.ns.add_dir("mem://drive/root/shared_folder");
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Cloud)])
        .await;
    let drive = f.tree.roots()[0];

    f.tree.expand(drive).await.unwrap();
    assert!(f.metadata.is_subscribed(drive));
    let my_drive = f.tree.children(drive)[0];
    f.tree.expand(my_drive).await.unwrap();
    assert!(f.metadata.is_subscribed(my_drive));
    assert_eq!(*f.metadata.prefetches.lock(), 2);

    let url = "mem://drive/root/shared_folder";
    f.metadata.set(
        url,
        EntryMetadata {
            shared: true,
            ..EntryMetadata::default()
        },
    );
    assert_eq!(f.tree.on_metadata_updated(&MetadataUpdate::new([url], ["canCopy"])), 0);
    assert_eq!(f.tree.on_metadata_updated(&MetadataUpdate::new([url], ["shared"])), 1);
    let folder = f.tree.find(&dir(url)).unwrap();
    assert!(f.tree.node(folder).unwrap().icon().shared);

    f.tree.collapse(my_drive).unwrap();
    f.tree.collapse(drive).unwrap();
    assert!(f.metadata.subscribers.lock().is_empty());
}

#[tokio::test]
async fn test_removed_listener_is_unsubscribed() {
    let f = fixture();
    let volume = f.ns.add_drive_volume();
    f.ns.add_dir("mem://drive/root/team");
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Cloud)])
        .await;
    let drive = f.tree.roots()[0];
    f.tree.expand(drive).await.unwrap();
    let my_drive = f.tree.children(drive)[0];
    f.tree.expand(my_drive).await.unwrap();
    let team = f.tree.find(&dir("mem://drive/root/team")).unwrap();
    f.ns.add_dir("mem://drive/root/team/sub");
    f.tree.expand(team).await.unwrap();
    assert!(f.metadata.is_subscribed(team));

    f.ns.remove("mem://drive/root/team");
    f.tree.update_tree_by_entry(&dir("mem://drive/root/team")).await;

    assert!(!f.metadata.is_subscribed(team));
    assert!(f.tree.node(team).is_none());
}

#[tokio::test]
async fn test_section_markers_and_reordering() {
    let f = fixture();
    let local = f.ns.add_local_volume("local");
    let drive = f.ns.add_drive_volume();
    f.ns.add_dir("mem://local/a");
    let descriptors = vec![
        RootDescriptor::shortcut(dir("mem://local/a"), Section::Top),
        RootDescriptor::fake(RootType::Recent, dir("fake://recent").named("Recent"), Section::Top),
        RootDescriptor::volume(local.clone(), Section::MyFiles),
        RootDescriptor::volume(drive.clone(), Section::Cloud),
    ];
    f.tree.set_root_descriptors(descriptors).await;

    let markers: Vec<Option<Section>> =
        f.tree.snapshot().iter().map(|n| n.section_start).collect();
    assert_eq!(
        markers,
        vec![None, None, Some(Section::MyFiles), Some(Section::Cloud)]
    );
    let local_id = f.tree.roots()[2];
    let drive_id = f.tree.roots()[3];

    f.tree
        .set_root_descriptors(vec![
            RootDescriptor::volume(drive, Section::Cloud),
            RootDescriptor::volume(local, Section::MyFiles),
        ])
        .await;

    assert_eq!(f.tree.roots(), vec![drive_id, local_id]);
    let markers: Vec<Option<Section>> =
        f.tree.snapshot().iter().map(|n| n.section_start).collect();
    assert_eq!(markers, vec![None, Some(Section::MyFiles)]);
}

#[tokio::test]
async fn test_root_list_change_reselects_current_directory() {
    let f = fixture();
    let volume = f.ns.add_local_volume("local");
    f.ns.add_dir("mem://local/a");
    f.model.set_current(Some(dir("mem://local/a")));

    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::MyFiles)])
        .await;

    assert_eq!(f.tree.selected(), f.tree.find(&dir("mem://local/a")));
    assert!(f.tree.selected().is_some());
}

#[tokio::test]
async fn test_entry_list_groups_ui_children_last() {
    let f = fixture();
    f.ns.add_local_volume("local");
    for d in ["Linux files", "Downloads", "Zip"] {
        f.ns.add_dir(&format!("mem://local/{}", d));
    }
    let descriptor = RootDescriptor::entry_list(
        RootType::MyFiles,
        dir("mem://local"),
        vec!["mem://local/Linux files".to_string()],
        Section::MyFiles,
    )
    .with_label("My files");
    f.tree.set_root_descriptors(vec![descriptor]).await;
    let root = f.tree.roots()[0];

    assert_eq!(labels(&f.tree, root), vec!["Downloads", "Zip", "Linux files"]);
    assert!(f.tree.node(root).unwrap().is_expanded());
    let downloads = f.tree.children(root)[0];
    assert_eq!(
        f.tree.node(downloads).unwrap().icon().icon,
        Icon::Root(RootType::Downloads)
    );
}

#[tokio::test]
async fn test_shortcut_activation() {
    let f = fixture();
    let volume = f.ns.add_local_volume("local");
    f.ns.add_dir("mem://local/a");
    f.tree
        .set_root_descriptors(vec![
            RootDescriptor::shortcut(dir("mem://local/a"), Section::Top),
            RootDescriptor::shortcut(dir("mem://local/gone"), Section::Top).with_label("Gone"),
            RootDescriptor::volume(volume, Section::MyFiles),
        ])
        .await;
    let roots = f.tree.roots();

    f.tree.activate(roots[0]).await.unwrap();
    f.tree.activate(roots[0]).await.unwrap();
    assert_eq!(*f.model.changed.lock(), vec!["mem://local/a".to_string()]);
    assert!(f.model.activated.lock().is_empty());

    let err = f.tree.activate(roots[1]).await.unwrap_err();
    assert!(matches!(err, TreeError::TargetNotFound(url) if url == "mem://local/gone"));
    assert_eq!(*f.model.not_found.lock(), vec!["Gone".to_string()]);
}

#[tokio::test]
async fn test_volume_activation_changes_directory_once() {
    let f = fixture();
    let root = local_tree(&f, &["a"]).await;

    assert!(f.tree.activate_by_index(0).await.unwrap());
    f.tree.activate(root).await.unwrap();

    assert_eq!(*f.model.changed.lock(), vec!["mem://local".to_string()]);
    assert_eq!(f.tree.selected(), Some(root));
    assert!(!f.tree.activate_by_index(3).await.unwrap());
}

#[tokio::test]
async fn test_unavailable_volume_reports_not_found() {
    let f = fixture();
    let volume = f.ns.add_local_volume("usb");
    f.ns.set_resolve_failure("usb", true);
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Removable)])
        .await;
    let root = f.tree.roots()[0];

    f.tree.expand(root).await.unwrap();
    assert!(!f.tree.node(root).unwrap().is_expanded());

    let err = f.tree.activate(root).await.unwrap_err();
    assert!(matches!(err, TreeError::TargetNotFound(_)));
    assert_eq!(*f.model.not_found.lock(), vec!["usb".to_string()]);
}

#[tokio::test]
async fn test_grouped_root_selects_primary_child() {
    let f = fixture();
    let volume = f.ns.add_drive_volume();
    f.tree
        .set_root_descriptors(vec![RootDescriptor::volume(volume, Section::Cloud)])
        .await;
    let drive = f.tree.roots()[0];
    let my_drive = f.tree.children(drive)[0];

    assert_eq!(f.tree.select(drive).unwrap(), my_drive);
    assert_eq!(
        f.tree.select_by_entry(&dir("mem://drive/root")).await.unwrap(),
        SelectOutcome::Unchanged
    );
}

#[tokio::test]
async fn test_new_directory_is_inserted_and_selected() {
    let f = fixture();
    let root = local_tree(&f, &["a", "c"]).await;
    let b = f.ns.add_dir("mem://local/b");

    let id = f.tree.update_and_select_new_directory(root, &b).unwrap();

    assert_eq!(labels(&f.tree, root), vec!["a", "b", "c"]);
    assert_eq!(f.tree.selected(), Some(id));
    assert!(f.tree.node(root).unwrap().is_expanded());
    assert_eq!(f.tree.update_and_select_new_directory(root, &b).unwrap(), id);
    assert_eq!(f.tree.children(root).len(), 3);
}

#[tokio::test]
async fn test_filter_change_redraws_recursively() {
    let f = fixture();
    let root = local_tree(&f, &["a", "a/skip", "a/keep", "b"]).await;
    f.tree.expand(root).await.unwrap();
    let a = f.tree.find(&dir("mem://local/a")).unwrap();
    f.tree.expand(a).await.unwrap();
    assert_eq!(labels(&f.tree, a), vec!["keep", "skip"]);

    f.tree
        .set_filter(Arc::new(|e: &Entry| e.name() != "skip"))
        .await;

    assert_eq!(labels(&f.tree, a), vec!["keep"]);
    assert_eq!(labels(&f.tree, root), vec!["a", "b"]);
}

#[tokio::test]
async fn test_default_filter_hides_dot_dirs() {
    let f = fixture();
    let root = local_tree(&f, &[".git", "src"]).await;
    f.tree.expand(root).await.unwrap();
    assert_eq!(labels(&f.tree, root), vec!["src"]);
}
