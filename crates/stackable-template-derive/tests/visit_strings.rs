#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use stackable_template::{
        Parameter, Processor, Template, TemplateObject, TemplateResource, VisitStrings,
        generator::GeneratorRegistry,
        visit::visit_object_strings,
    };

    #[derive(Clone, Debug, Default, PartialEq, VisitStrings)]
    pub struct DatabaseCluster {
        pub metadata: ObjectMeta,
        pub spec: DatabaseClusterSpec,
    }

    #[derive(Clone, Debug, Default, PartialEq, VisitStrings)]
    pub struct DatabaseClusterSpec {
        pub image: String,
        pub replicas: u16,
        pub users: Vec<User>,
        #[visit_strings(skip)]
        pub config_hash: String,
        pub storage: Storage,
    }

    #[derive(Clone, Debug, Default, PartialEq, VisitStrings)]
    pub struct User(pub String, pub Option<String>);

    #[derive(Clone, Debug, Default, PartialEq, VisitStrings)]
    pub enum Storage {
        #[default]
        Ephemeral,
        Persistent {
            class: String,
            size_gb: u32,
        },
    }

    impl TemplateResource for DatabaseCluster {
        fn metadata_mut(&mut self) -> &mut ObjectMeta {
            &mut self.metadata
        }
    }

    #[derive(Debug, PartialEq, VisitStrings)]
    #[visit_strings(bound = "T: VisitStrings")]
    pub struct Wrapper<T> {
        pub inner: T,
        pub note: String,
    }

    #[derive(Debug, PartialEq, VisitStrings)]
    pub struct Unit;

    fn cluster() -> DatabaseCluster {
        DatabaseCluster {
            metadata: ObjectMeta {
                name: Some("${NAME}".to_owned()),
                namespace: Some("templates".to_owned()),
                ..Default::default()
            },
            spec: DatabaseClusterSpec {
                image: "postgres:${VERSION}".to_owned(),
                replicas: 3,
                users: vec![User(
                    "${NAME}-admin".to_owned(),
                    Some("${PASSWORD}".to_owned()),
                )],
                config_hash: "${NAME}".to_owned(),
                storage: Storage::Persistent {
                    class: "${STORAGE_CLASS}".to_owned(),
                    size_gb: 10,
                },
            },
        }
    }

    #[test]
    fn test_derive_visit_strings_nested() {
        let mut cluster = cluster();
        let mut visited = Vec::new();
        visit_object_strings(&mut cluster, |s| {
            visited.push(s.to_owned());
            s.to_uppercase()
        });

        assert_eq!(
            visited,
            [
                "${NAME}",
                "templates",
                "postgres:${VERSION}",
                "${NAME}-admin",
                "${PASSWORD}",
                "${STORAGE_CLASS}",
            ]
        );
        assert_eq!(cluster.spec.image, "POSTGRES:${VERSION}");
        assert_eq!(cluster.spec.config_hash, "${NAME}");
    }

    #[test]
    fn test_derive_visit_strings_generic_bound() {
        let mut wrapper = Wrapper {
            inner: vec!["a".to_owned()],
            note: "b".to_owned(),
        };
        visit_object_strings(&mut wrapper, |s| format!("{s}{s}"));
        assert_eq!(
            wrapper,
            Wrapper {
                inner: vec!["aa".to_owned()],
                note: "bb".to_owned(),
            }
        );

        let mut unit = Unit;
        visit_object_strings(&mut unit, |_| unreachable!("unit structs have no strings"));
    }

    #[test]
    fn test_derive_visit_strings_custom_resource_template() {
        let mut template = Template::<DatabaseCluster>::default();
        for (name, value) in [
            ("NAME", "orders"),
            ("VERSION", "16"),
            ("PASSWORD", "secret"),
        ] {
            template.add_parameter(Parameter {
                name: name.to_owned(),
                value: value.to_owned(),
                ..Default::default()
            });
        }
        template.objects.push(TemplateObject::Typed(cluster()));
        template.object_labels = BTreeMap::from([("app".to_owned(), "orders".to_owned())]);

        let template = Processor::new(GeneratorRegistry::with_defaults())
            .process(&template)
            .into_result()
            .unwrap();

        let TemplateObject::Typed(cluster) = &template.objects[0] else {
            panic!("typed objects stay typed");
        };
        assert_eq!(cluster.metadata.name.as_deref(), Some("orders"));
        assert_eq!(cluster.metadata.namespace, None);
        assert_eq!(
            cluster.metadata.labels,
            Some(BTreeMap::from([("app".to_owned(), "orders".to_owned())]))
        );
        assert_eq!(cluster.spec.image, "postgres:16");
        assert_eq!(
            cluster.spec.users,
            [User("orders-admin".to_owned(), Some("secret".to_owned()))]
        );
        assert_eq!(
            cluster.spec.storage,
            Storage::Persistent {
                class: "${STORAGE_CLASS}".to_owned(),
                size_gb: 10,
            }
        );
    }
}
