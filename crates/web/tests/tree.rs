use switchyard_web::tree::Node;
use switchyard_web::{InsertError, Params};

macro_rules! match_tests {
    ($($name:ident {
        routes = $routes:expr,
        $( $path:literal :: $route:literal =>
            $( $(@$none:tt)? None )?
            $( $(@$some:tt)? { $( $key:literal => $val:literal ),* $(,)? } )?
        ),* $(,)?
    }),* $(,)?) => { $(
        #[test]
        fn $name() {
            let mut tree = Node::new();
            for route in $routes {
                tree.insert(route, route.to_owned()).unwrap();
            }

            $({
                let mut params = Params::new();
                match tree.at($path, &mut params) {
                    None => {
                        $($( @$some )?
                            panic!("expected value for path '{}'", $path)
                        )?
                    }
                    Some(value) => {
                        $($( @$some )?
                            assert_eq!(value, $route, "wrong value for path '{}'", $path);

                            let expected: Vec<(&str, &str)> = vec![$(($key, $val)),*];
                            let got: Vec<(&str, &str)> = params.iter().map(|p| (p.key, p.value)).collect();
                            assert_eq!(got, expected, "wrong params for path '{}'", $path);
                        )?

                        $($( @$none )?
                            panic!("unexpected value '{}' for path '{}'", value, $path);
                        )?
                    }
                }
            })*
        }
    )* };
}

macro_rules! insert_tests {
    ($($name:ident {
        $($route:literal => $res:expr),* $(,)?
    }),* $(,)?) => { $(
        #[test]
        fn $name() {
            let mut tree = Node::new();
            $(
                let res = tree.insert($route, $route.to_owned());
                assert_eq!(res, $res, "unexpected result for path '{}'", $route);
            )*
        }
    )* };
}

macro_rules! tsr_tests {
    ($($name:ident {
        routes = $routes:expr,
        $($path:literal => $tsr:expr),* $(,)?
    }),* $(,)?) => { $(
        #[test]
        fn $name() {
            let mut tree = Node::new();
            for route in $routes {
                tree.insert(route, route.to_owned()).unwrap();
            }

            $(
                let mut params = Params::new();
                let found = tree.lookup($path, &mut params);
                assert!(found.value.is_none(), "unexpected match for '{}'", $path);
                assert_eq!(found.tsr, $tsr, "wrong tsr value for '{}'", $path);
                assert!(params.is_empty());
            )*
        }
    )* };
}

match_tests! {
    basic {
        routes = [
            "/hi",
            "/contact",
            "/co",
            "/c",
            "/a",
            "/ab",
            "/doc/",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/α",
            "/β",
        ],
        "/a" :: "/a" => {},
        "/" :: "" => None,
        "/hi" :: "/hi" => {},
        "/contact" :: "/contact" => {},
        "/co" :: "/co" => {},
        "/con" :: "" => None,
        "/cona" :: "" => None,
        "/no" :: "" => None,
        "/ab" :: "/ab" => {},
        "/α" :: "/α" => {},
        "/β" :: "/β" => {},
        "/doc/go1.html" :: "/doc/go1.html" => {},
    },
    wildcard {
        routes = [
            "/",
            "/cmd/:tool/:sub",
            "/cmd/:tool/",
            "/src/*filepath",
            "/search/",
            "/search/:query",
            "/user_:name",
            "/user_:name/about",
            "/files/:dir/*filepath",
            "/doc/",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/info/:user/public",
            "/info/:user/project/:project",
        ],
        "/" :: "/" => {},
        "/cmd/test/" :: "/cmd/:tool/" => { "tool" => "test" },
        "/cmd/test" :: "" => None,
        "/cmd/test/3" :: "/cmd/:tool/:sub" => { "tool" => "test", "sub" => "3" },
        "/src/" :: "/src/*filepath" => { "filepath" => "" },
        "/src/some/file.png" :: "/src/*filepath" => { "filepath" => "some/file.png" },
        "/search/" :: "/search/" => {},
        "/search/someth!ng+in+ünìcodé" :: "/search/:query" => { "query" => "someth!ng+in+ünìcodé" },
        "/search/someth!ng+in+ünìcodé/" :: "" => None,
        "/user_gopher" :: "/user_:name" => { "name" => "gopher" },
        "/user_gopher/about" :: "/user_:name/about" => { "name" => "gopher" },
        "/files/js/inc/framework.js" :: "/files/:dir/*filepath" => { "dir" => "js", "filepath" => "inc/framework.js" },
        "/info/gordon/public" :: "/info/:user/public" => { "user" => "gordon" },
        "/info/gordon/project/go" :: "/info/:user/project/:project" => { "user" => "gordon", "project" => "go" },
        "/info/gordon" :: "" => None,
    },
    static_beats_param {
        routes = [
            "/users/new",
            "/users/:id",
            "/users/:id/edit",
            "/users/news/today",
        ],
        "/users/new" :: "/users/new" => {},
        "/users/news" :: "/users/:id" => { "id" => "news" },
        "/users/news/today" :: "/users/news/today" => {},
        "/users/new/edit" :: "/users/:id/edit" => { "id" => "new" },
        "/users/" :: "" => None,
    },
    duplicate_param_names {
        routes = ["/pair/:a/:a"],
        "/pair/1/2" :: "/pair/:a/:a" => { "a" => "1", "a" => "2" },
    },
}

insert_tests! {
    wildcard_conflict {
        "/cmd/:tool/:sub" => Ok(()),
        "/cmd/vet" => Ok(()),
        "/cmd/:name/x" => Err(InsertError::WildcardConflict {
            path: "/cmd/:name/x".to_owned(),
            segment: ":name".to_owned(),
            existing: ":tool".to_owned(),
        }),
        "/src/*filepath" => Ok(()),
        "/src/*filepathx" => Err(InsertError::WildcardConflict {
            path: "/src/*filepathx".to_owned(),
            segment: "*filepathx".to_owned(),
            existing: "*filepath".to_owned(),
        }),
        "/src/:file" => Err(InsertError::WildcardConflict {
            path: "/src/:file".to_owned(),
            segment: ":file".to_owned(),
            existing: "*filepath".to_owned(),
        }),
        "/src/" => Ok(()),
        "/src1/" => Ok(()),
        "/src1/*filepath" => Ok(()),
        "/search/:query" => Ok(()),
        "/search/invalid" => Ok(()),
        "/user_:name" => Ok(()),
        "/user_x" => Ok(()),
        "/id:id" => Ok(()),
        "/id/:id" => Ok(()),
    },
    duplicates {
        "/" => Ok(()),
        "/" => Err(InsertError::Conflict { path: "/".to_owned() }),
        "/doc/" => Ok(()),
        "/doc/" => Err(InsertError::Conflict { path: "/doc/".to_owned() }),
        "/user_:name" => Ok(()),
        "/user_:name" => Err(InsertError::Conflict { path: "/user_:name".to_owned() }),
        "/src/*filepath" => Ok(()),
        "/src/*filepath" => Err(InsertError::Conflict { path: "/src/*filepath".to_owned() }),
    },
    malformed {
        "users" => Err(InsertError::MissingLeadingSlash { path: "users".to_owned() }),
        "/:" => Err(InsertError::UnnamedWildcard { path: "/:".to_owned() }),
        "/files/*" => Err(InsertError::UnnamedWildcard { path: "/files/*".to_owned() }),
        "/x/:id:name" => Err(InsertError::TooManyWildcards {
            path: "/x/:id:name".to_owned(),
            segment: ":id:name".to_owned(),
        }),
        "/src/*filepath/x" => Err(InsertError::CatchAllNotLast { path: "/src/*filepath/x".to_owned() }),
        "/src2*filepath" => Err(InsertError::NoSlashBeforeCatchAll { path: "/src2*filepath".to_owned() }),
    },
}

tsr_tests! {
    trailing_slash {
        routes = [
            "/hi",
            "/b/",
            "/search/:query",
            "/cmd/:tool/",
            "/src/*filepath",
            "/x",
            "/x/y",
            "/y/",
            "/y/z",
            "/0/:id",
            "/0/:id/1",
            "/1/:id/",
            "/1/:id/2",
            "/aa",
            "/a/",
            "/admin",
            "/admin/:category",
            "/admin/:category/:page",
            "/doc",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/no/a",
            "/no/b",
            "/api/hello/:name",
        ],
        "/hi/" => true,
        "/b" => true,
        "/search/gopher/" => true,
        "/cmd/vet" => true,
        "/src" => true,
        "/x/" => true,
        "/y" => true,
        "/0/go/" => true,
        "/1/go" => true,
        "/a" => true,
        "/admin/" => true,
        "/admin/config/" => true,
        "/admin/config/permissions/" => true,
        "/doc/" => true,
        "/" => false,
        "/no" => false,
        "/no/" => false,
        "/_" => false,
        "/_/" => false,
        "/api/world/abc" => false,
    },
}

#[test]
fn find_case_insensitive() {
    let mut tree = Node::new();
    for route in [
        "/hi",
        "/b/",
        "/ABC/",
        "/search/:query",
        "/cmd/:tool/",
        "/src/*filepath",
        "/x",
        "/x/y",
        "/doc/go_faq.html",
        "/Π",
        "/u/äpfêl/",
        "/v/Öpfêl",
    ] {
        tree.insert(route, ()).unwrap();
    }

    let exact = [
        ("/HI", "/hi"),
        ("/B/", "/b/"),
        ("/abc/", "/ABC/"),
        ("/SEARCH/QueryForMe", "/search/QueryForMe"),
        ("/CMD/PROG/", "/cmd/PROG/"),
        ("/SRC/FILE/PATH", "/src/FILE/PATH"),
        ("/X/Y", "/x/y"),
        ("/DOC/GO_FAQ.HTML", "/doc/go_faq.html"),
        ("/π", "/Π"),
        ("/U/ÄPFÊL/", "/u/äpfêl/"),
        ("/v/öpfêl", "/v/Öpfêl"),
    ];
    for (path, fixed) in exact {
        assert_eq!(tree.find_case_insensitive(path, false).as_deref(), Some(fixed), "{path}");
        assert_eq!(tree.find_case_insensitive(path, true).as_deref(), Some(fixed), "{path}");
    }

    let with_slash_fix = [("/HI/", "/hi"), ("/B", "/b/"), ("/abc", "/ABC/"), ("/CMD/PROG", "/cmd/PROG/"), ("/X/Y/", "/x/y")];
    for (path, fixed) in with_slash_fix {
        assert_eq!(tree.find_case_insensitive(path, false), None, "{path}");
        assert_eq!(tree.find_case_insensitive(path, true).as_deref(), Some(fixed), "{path}");
    }

    for path in ["/nope", "/HIGH", "/u/apfel/", "/"] {
        assert_eq!(tree.find_case_insensitive(path, true), None, "{path}");
    }
}

#[test]
fn routes_walks_every_value() {
    let mut tree = Node::new();
    let registered = ["/", "/users", "/users/:id", "/users/:id/posts", "/static/*path"];
    for route in registered {
        tree.insert(route, route).unwrap();
    }

    let routes = tree.routes();
    assert_eq!(routes.len(), registered.len());
    for (path, value) in routes {
        assert_eq!(path, **value);
    }
    assert_eq!(tree.max_params(), 1);
}
