//! Named example programs for embedding front-ends.
//!
//! The catalogue is an ordered list of `{name, code}` pairs a UI can
//! display and load into its editor. Every program runs under this
//! interpreter as-is; saved programs use plain UTF-8 text with the `.lsp`
//! extension.

/// One catalogue entry: a display name and the program source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExampleProgram {
    pub name: &'static str,
    pub code: &'static str,
}

/// The example programs, in display order.
pub fn example_programs() -> &'static [ExampleProgram] {
    EXAMPLE_PROGRAMS
}

static EXAMPLE_PROGRAMS: &[ExampleProgram] = &[
    ExampleProgram {
        name: "Basic Arithmetic",
        code: "\
; Basic arithmetic operations
(print (+ 1 2 3 4))
(print (- 10 5))
(print (* 2 3 4))
(print (/ 10 2))
",
    },
    ExampleProgram {
        name: "List Operations",
        code: "\
; Working with lists
(setq numbers (list 1 2 3 4 5))
(print numbers)
(print (car numbers))
(print (cdr numbers))
(print (cons 0 numbers))
(print (append numbers (list 6 7)))
(print (reverse numbers))
",
    },
    ExampleProgram {
        name: "Factorial Function",
        code: "\
; Recursive factorial
(defun factorial (n)
  (if (= n 0)
      1
      (* n (factorial (- n 1)))))

(print (factorial 5))
",
    },
    ExampleProgram {
        name: "Fibonacci Sequence",
        code: "\
; Fibonacci numbers
(defun fibonacci (n)
  (cond ((= n 0) 0)
        ((= n 1) 1)
        (t (+ (fibonacci (- n 1))
              (fibonacci (- n 2))))))

(print (fibonacci 10))
",
    },
    ExampleProgram {
        name: "Map and Filter",
        code: "\
; Higher-order functions
(defun square (x) (* x x))
(print (mapcar 'square (list 1 2 3 4 5)))

(defun filter (pred items)
  (cond ((null items) nil)
        ((funcall pred (car items))
         (cons (car items) (filter pred (cdr items))))
        (t (filter pred (cdr items)))))

(defun evenp (n) (= (mod n 2) 0))
(print (filter 'evenp (list 1 2 3 4 5 6)))
",
    },
];
